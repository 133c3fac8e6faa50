use facestream_analysis::Emotion;

pub const UNKNOWN_EMOTION: &str = "Unknown";

const ANGER_LABELS: [&str; 2] = ["ANGRY", "DISGUSTED"];

#[derive(Debug, Clone, PartialEq)]
pub struct DominantEmotion {
    pub label: String,
    pub confidence: f32,
    /// True when the selected label is anger-like (`ANGRY`, `DISGUSTED`).
    pub anger_observed: bool,
    /// 1-based input position of the selected label when it is anger-like.
    pub anger_position: Option<usize>,
}

impl Default for DominantEmotion {
    fn default() -> Self {
        Self {
            label: UNKNOWN_EMOTION.to_string(),
            confidence: 0.0,
            anger_observed: false,
            anger_position: None,
        }
    }
}

/// Picks the highest-confidence emotion in a single left-to-right pass.
///
/// A candidate replaces the running maximum when its confidence is greater
/// than or equal to it, so among equal maxima the last one wins.
pub fn select_dominant(emotions: &[Emotion]) -> DominantEmotion {
    let mut dominant = DominantEmotion::default();

    for (position, emotion) in emotions.iter().enumerate() {
        if emotion.confidence >= dominant.confidence {
            dominant.confidence = emotion.confidence;
            dominant.label.clone_from(&emotion.label);
            dominant.anger_observed = ANGER_LABELS.contains(&emotion.label.as_str());
            dominant.anger_position = dominant.anger_observed.then_some(position + 1);
        }
    }

    dominant
}
