//! Overall quality signal for a pipeline run.
//!
//! Each stage reports a confidence and whether its result was substituted.
//! The overall score is a weighted mean of stage confidences, discounted when
//! anything fell back.

use serde::Serialize;

/// Pipeline stages that report a confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Face,
    WhiteBalance,
    Lighting,
    Tone,
    Body,
}

impl Stage {
    /// Contribution to the overall score.
    pub fn weight(self) -> f32 {
        match self {
            Stage::Face => 0.25,
            Stage::WhiteBalance => 0.20,
            Stage::Lighting => 0.25,
            Stage::Tone => 0.30,
            Stage::Body => 0.25,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Face => "face",
            Stage::WhiteBalance => "white_balance",
            Stage::Lighting => "lighting",
            Stage::Tone => "tone",
            Stage::Body => "body",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub confidence: f32,
    pub is_fallback: bool,
}

impl StageReport {
    pub fn new(stage: Stage, confidence: f32, is_fallback: bool) -> Self {
        Self {
            stage,
            confidence,
            is_fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConfidenceGrade {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceGrade {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            ConfidenceGrade::High
        } else if score >= 0.6 {
            ConfidenceGrade::Medium
        } else if score >= 0.4 {
            ConfidenceGrade::Low
        } else {
            ConfidenceGrade::VeryLow
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallConfidence {
    pub score: f32,
    pub grade: ConfidenceGrade,
    /// True if any stage substituted a fallback.
    pub is_fallback: bool,
    /// True when no real face was found, so the whole result is illustrative.
    pub sample_result: bool,
    pub stages: Vec<StageReport>,
}

/// Multiplier applied to the score when any stage fell back.
pub const FALLBACK_PENALTY: f32 = 0.8;

/// Combine stage reports into one score and grade.
pub fn propagate(stages: &[StageReport]) -> OverallConfidence {
    let weight_sum: f32 = stages.iter().map(|s| s.stage.weight()).sum();
    let mut score = if weight_sum > 0.0 {
        stages
            .iter()
            .map(|s| s.stage.weight() * s.confidence.clamp(0.0, 1.0))
            .sum::<f32>()
            / weight_sum
    } else {
        0.0
    };

    let is_fallback = stages.iter().any(|s| s.is_fallback);
    if is_fallback {
        score *= FALLBACK_PENALTY;
    }
    let sample_result = stages
        .iter()
        .any(|s| s.stage == Stage::Face && s.is_fallback);

    OverallConfidence {
        score,
        grade: ConfidenceGrade::from_score(score),
        is_fallback,
        sample_result,
        stages: stages.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_measured() {
        let overall = propagate(&[
            StageReport::new(Stage::Face, 0.9, false),
            StageReport::new(Stage::WhiteBalance, 1.0, false),
            StageReport::new(Stage::Lighting, 0.9, false),
            StageReport::new(Stage::Tone, 0.8, false),
        ]);
        let expected = (0.25 * 0.9 + 0.20 * 1.0 + 0.25 * 0.9 + 0.30 * 0.8) / 1.0;
        assert!((overall.score - expected).abs() < 1e-5);
        assert_eq!(overall.grade, ConfidenceGrade::High);
        assert!(!overall.is_fallback);
        assert!(!overall.sample_result);
        assert_eq!(overall.stages.len(), 4);
    }

    #[test]
    fn fallback_is_penalized_and_flagged() {
        let stages = [
            StageReport::new(Stage::Face, 0.5, true),
            StageReport::new(Stage::WhiteBalance, 0.6, false),
        ];
        let overall = propagate(&stages);
        let mean = (0.25 * 0.5 + 0.20 * 0.6) / 0.45;
        assert!((overall.score - mean * FALLBACK_PENALTY).abs() < 1e-5);
        assert!(overall.is_fallback);
        assert!(overall.sample_result);
    }

    #[test]
    fn non_face_fallback_is_not_sample() {
        let overall = propagate(&[
            StageReport::new(Stage::Face, 0.9, false),
            StageReport::new(Stage::WhiteBalance, 0.5, true),
        ]);
        assert!(overall.is_fallback);
        assert!(!overall.sample_result);
    }

    #[test]
    fn grades() {
        assert_eq!(ConfidenceGrade::from_score(0.85), ConfidenceGrade::High);
        assert_eq!(ConfidenceGrade::from_score(0.6), ConfidenceGrade::Medium);
        assert_eq!(ConfidenceGrade::from_score(0.45), ConfidenceGrade::Low);
        assert_eq!(ConfidenceGrade::from_score(0.1), ConfidenceGrade::VeryLow);
        assert!(ConfidenceGrade::High > ConfidenceGrade::Low);
    }

    #[test]
    fn empty_is_very_low() {
        let overall = propagate(&[]);
        assert_eq!(overall.score, 0.0);
        assert_eq!(overall.grade, ConfidenceGrade::VeryLow);
    }
}
