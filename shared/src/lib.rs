use strum_macros::Display;

pub const NORMAL_MESSAGE: &str = "✅ Insulator is NORMAL — no repair required.";
pub const DAMAGED_MESSAGE: &str = "⚠️ Insulator is DAMAGED — maintenance/repair required.";
pub const NO_FILE_MESSAGE: &str = "No file uploaded.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Verdict {
    #[strum(serialize = "NORMAL")]
    Normal,
    #[strum(serialize = "DAMAGED")]
    Damaged,
}

impl Verdict {
    /// Only a strictly greater healthy probability yields `Normal`; ties and
    /// NaN fall through to `Damaged`.
    pub fn from_probabilities(healthy: f32, damaged: f32) -> Self {
        if healthy > damaged {
            Verdict::Normal
        } else {
            Verdict::Damaged
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Normal => NORMAL_MESSAGE,
            Verdict::Damaged => DAMAGED_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub healthy_probability: f32,
    pub damaged_probability: f32,
    pub verdict: Verdict,
}

impl ClassificationResult {
    pub fn new(healthy_probability: f32, damaged_probability: f32) -> Self {
        Self {
            healthy_probability,
            damaged_probability,
            verdict: Verdict::from_probabilities(healthy_probability, damaged_probability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_higher_healthy_is_normal() {
        assert_eq!(Verdict::from_probabilities(0.9, 0.1), Verdict::Normal);
        assert_eq!(Verdict::from_probabilities(0.5001, 0.4999), Verdict::Normal);
    }

    #[test]
    fn test_tie_is_damaged() {
        assert_eq!(Verdict::from_probabilities(0.5, 0.5), Verdict::Damaged);
        assert_eq!(Verdict::from_probabilities(0.0, 0.0), Verdict::Damaged);
    }

    #[test]
    fn test_higher_damaged_is_damaged() {
        assert_eq!(Verdict::from_probabilities(0.2, 0.8), Verdict::Damaged);
    }

    #[test]
    fn test_nan_is_damaged() {
        assert_eq!(Verdict::from_probabilities(f32::NAN, 0.1), Verdict::Damaged);
        assert_eq!(Verdict::from_probabilities(0.9, f32::NAN), Verdict::Damaged);
    }

    #[test]
    fn test_messages_are_exact() {
        assert_eq!(
            Verdict::Normal.message(),
            "✅ Insulator is NORMAL — no repair required."
        );
        assert_eq!(
            Verdict::Damaged.message(),
            "⚠️ Insulator is DAMAGED — maintenance/repair required."
        );
    }

    #[test]
    fn test_verdict_labels() {
        assert_eq!(Verdict::Normal.to_string(), "NORMAL");
        assert_eq!(Verdict::Damaged.to_string(), "DAMAGED");
    }

    #[test]
    fn test_result_derives_verdict() {
        let result = ClassificationResult::new(0.9, 0.1);
        assert_eq!(result.verdict, Verdict::Normal);
        assert_eq!(result.healthy_probability, 0.9);
        assert_eq!(result.damaged_probability, 0.1);
    }
}
