//! 12-season personal-colour classification.
//!
//! Each season has a reference skin colour (centroid) in L*a*b*. A sample is
//! assigned to the nearest centroid under a per-axis weighted Euclidean
//! distance; confidence measures how much closer it is to the winner than to
//! the runner-up.

use serde::Serialize;

use crate::color::LabColor;
use crate::config::ClassifierConfig;

/// Undertone axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tone {
    Warm,
    Cool,
}

/// Depth axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Depth {
    Light,
    Deep,
}

/// The twelve seasons: four families, three variants each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    LightSpring,
    TrueSpring,
    BrightSpring,
    LightSummer,
    TrueSummer,
    SoftSummer,
    SoftAutumn,
    TrueAutumn,
    DeepAutumn,
    BrightWinter,
    TrueWinter,
    DeepWinter,
}

impl Season {
    pub const ALL: [Season; 12] = [
        Season::LightSpring,
        Season::TrueSpring,
        Season::BrightSpring,
        Season::LightSummer,
        Season::TrueSummer,
        Season::SoftSummer,
        Season::SoftAutumn,
        Season::TrueAutumn,
        Season::DeepAutumn,
        Season::BrightWinter,
        Season::TrueWinter,
        Season::DeepWinter,
    ];

    /// Spring and Autumn are warm; Summer and Winter are cool.
    pub fn tone(self) -> Tone {
        use Season::*;
        match self {
            LightSpring | TrueSpring | BrightSpring | SoftAutumn | TrueAutumn | DeepAutumn => {
                Tone::Warm
            }
            LightSummer | TrueSummer | SoftSummer | BrightWinter | TrueWinter | DeepWinter => {
                Tone::Cool
            }
        }
    }

    /// Spring and Summer are light; Autumn and Winter are deep.
    pub fn depth(self) -> Depth {
        use Season::*;
        match self {
            LightSpring | TrueSpring | BrightSpring | LightSummer | TrueSummer | SoftSummer => {
                Depth::Light
            }
            SoftAutumn | TrueAutumn | DeepAutumn | BrightWinter | TrueWinter | DeepWinter => {
                Depth::Deep
            }
        }
    }

    /// Reference skin colour for the season.
    pub fn centroid(self) -> LabColor {
        use Season::*;
        match self {
            LightSpring => LabColor::new(72.0, 12.0, 21.0),
            TrueSpring => LabColor::new(66.0, 14.0, 25.0),
            BrightSpring => LabColor::new(68.0, 16.0, 20.0),
            LightSummer => LabColor::new(72.0, 11.0, 14.0),
            TrueSummer => LabColor::new(65.0, 15.0, 12.0),
            SoftSummer => LabColor::new(61.0, 11.0, 15.0),
            SoftAutumn => LabColor::new(60.0, 11.0, 20.0),
            TrueAutumn => LabColor::new(54.0, 14.0, 25.0),
            DeepAutumn => LabColor::new(46.0, 15.0, 23.0),
            BrightWinter => LabColor::new(57.0, 18.0, 13.0),
            TrueWinter => LabColor::new(50.0, 15.0, 11.0),
            DeepWinter => LabColor::new(42.0, 14.0, 13.0),
        }
    }
}

/// Distance from the sample to one centroid.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SeasonScore {
    pub season: Season,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToneClassification {
    pub season: Season,
    pub tone: Tone,
    pub depth: Depth,
    pub confidence: f32,
    /// The classified sample.
    pub lab: LabColor,
    /// CIEDE2000 gap between the sample and the chosen centroid.
    pub delta_e: f32,
    /// Every season, nearest first. When a tie-break picks the runner-up,
    /// it is moved to the front so `ranking[0]` is always `season`.
    pub ranking: Vec<SeasonScore>,
    pub is_fallback: bool,
}

impl ToneClassification {
    /// A result for `season` that was not measured, carrying the centroid as sample.
    pub fn unmeasured(season: Season, confidence: f32) -> Self {
        Self {
            season,
            tone: season.tone(),
            depth: season.depth(),
            confidence,
            lab: season.centroid(),
            delta_e: 0.0,
            ranking: vec![SeasonScore {
                season,
                distance: 0.0,
            }],
            is_fallback: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersonalColorClassifier {
    config: ClassifierConfig,
}

impl PersonalColorClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Weighted Euclidean distance in L*a*b*.
    pub fn distance(&self, a: &LabColor, b: &LabColor) -> f32 {
        let [wl, wa, wb] = self.config.weights;
        let dl = a.l - b.l;
        let da = a.a - b.a;
        let db = a.b - b.b;
        (wl * dl * dl + wa * da * da + wb * db * db).sqrt()
    }

    /// Classify a sample skin colour.
    ///
    /// When the two nearest centroids are within `tie_epsilon` and disagree on
    /// tone, the one matching the sample's b* side of `warm_b_pivot` wins.
    pub fn classify(&self, sample: LabColor) -> ToneClassification {
        let mut ranking: Vec<SeasonScore> = Season::ALL
            .iter()
            .map(|&season| SeasonScore {
                season,
                distance: self.distance(&sample, &season.centroid()),
            })
            .collect();
        ranking.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let (first, second) = (ranking[0], ranking[1]);
        let confidence = if second.distance > 0.0 {
            (1.0 - first.distance / second.distance).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut chosen = first.season;
        if second.distance - first.distance < self.config.tie_epsilon
            && first.season.tone() != second.season.tone()
        {
            let preferred = if sample.b > self.config.warm_b_pivot {
                Tone::Warm
            } else {
                Tone::Cool
            };
            if second.season.tone() == preferred {
                chosen = second.season;
                ranking.swap(0, 1);
            }
        }

        tracing::debug!(
            season = ?chosen,
            nearest = first.distance,
            runner_up = second.distance,
            confidence,
            "tone classified"
        );

        ToneClassification {
            season: chosen,
            tone: chosen.tone(),
            depth: chosen.depth(),
            confidence: if confidence.is_finite() { confidence } else { 0.0 },
            lab: sample,
            delta_e: sample.delta_e2000(&chosen.centroid()),
            ranking,
            is_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> PersonalColorClassifier {
        PersonalColorClassifier::new(ClassifierConfig::default())
    }

    #[test]
    fn twelve_distinct_centroids() {
        for (i, a) in Season::ALL.iter().enumerate() {
            for b in &Season::ALL[i + 1..] {
                assert!(a.centroid().delta_e76(&b.centroid()) > 3.0, "{a:?} ~ {b:?}");
            }
        }
    }

    #[test]
    fn axes_cover_four_families() {
        let warm_light = Season::ALL
            .iter()
            .filter(|s| s.tone() == Tone::Warm && s.depth() == Depth::Light)
            .count();
        assert_eq!(warm_light, 3);
        assert_eq!(Season::DeepWinter.tone(), Tone::Cool);
        assert_eq!(Season::DeepWinter.depth(), Depth::Deep);
    }

    #[test]
    fn centroid_classifies_as_itself() {
        for season in Season::ALL {
            let result = classifier().classify(season.centroid());
            assert_eq!(result.season, season);
            assert!((result.confidence - 1.0).abs() < 1e-6);
            assert_eq!(result.ranking.len(), 12);
        }
    }

    #[test]
    fn typical_skin_is_confident() {
        let sample = LabColor::from_rgb([205.0, 155.0, 130.0]);
        let result = classifier().classify(sample);
        assert_eq!(result.season, Season::BrightSpring);
        assert!(result.confidence > 0.6);
        assert!(!result.is_fallback);
    }

    #[test]
    fn midpoint_has_no_confidence() {
        let a = Season::TrueSummer.centroid();
        let b = Season::BrightWinter.centroid();
        let mid = LabColor::new((a.l + b.l) / 2.0, (a.a + b.a) / 2.0, (a.b + b.b) / 2.0);
        let result = classifier().classify(mid);
        assert!(result.confidence < 0.05, "confidence {}", result.confidence);
    }

    #[test]
    fn tie_prefers_tone_matching_b_sign() {
        // SoftSummer (cool) and SoftAutumn (warm) are equidistant from their midpoint.
        let a = Season::SoftSummer.centroid();
        let b = Season::SoftAutumn.centroid();
        let mid = LabColor::new((a.l + b.l) / 2.0, (a.a + b.a) / 2.0, (a.b + b.b) / 2.0);
        let warm = classifier().classify(mid);
        assert_eq!(warm.tone, Tone::Warm);
        assert_eq!(warm.ranking[0].season, warm.season);

        let config = ClassifierConfig {
            warm_b_pivot: 30.0,
            ..ClassifierConfig::default()
        };
        let cool = PersonalColorClassifier::new(config).classify(mid);
        assert_eq!(cool.tone, Tone::Cool);
        assert_eq!(cool.ranking[0].season, cool.season);
    }

    proptest! {
        #[test]
        fn always_one_season_with_bounded_confidence(
            l in 0.0f32..100.0, a in -60.0f32..60.0, b in -60.0f32..60.0,
        ) {
            let result = classifier().classify(LabColor::new(l, a, b));
            prop_assert!(Season::ALL.contains(&result.season));
            prop_assert!((0.0..=1.0).contains(&result.confidence));
            prop_assert_eq!(result.tone, result.season.tone());
            prop_assert_eq!(result.ranking[0].season, result.season);
        }
    }
}
