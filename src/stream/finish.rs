//! Finish-reason resolution.
//!
//! Signals come in two classes. An overwrite replaces whatever value is
//! current; a fill only applies while the value is still `Unknown`. The
//! resolved value is therefore the last overwrite if any fired, otherwise
//! the first fill, otherwise `Unknown`.

use crate::protocol::events::FinishReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishSignal {
    Overwrite(FinishReason),
    FillIfUnknown(FinishReason),
}

impl FinishSignal {
    /// A payload failed validation.
    pub const PARSE_FAILURE: Self = FinishSignal::Overwrite(FinishReason::Error);
    /// `message_stop` stream event.
    pub const MESSAGE_STOP: Self = FinishSignal::FillIfUnknown(FinishReason::Stop);

    /// Signal for a `message_delta` stop reason; `None` for values that do
    /// not affect the finish reason.
    #[must_use]
    pub fn from_stop_reason(stop_reason: &str) -> Option<Self> {
        match stop_reason {
            "tool_use" => Some(FinishSignal::Overwrite(FinishReason::ToolCalls)),
            "end_turn" | "stop_sequence" => Some(FinishSignal::Overwrite(FinishReason::Stop)),
            _ => None,
        }
    }

    /// Signal for a `ResultMessage` subtype.
    #[must_use]
    pub fn from_result_subtype(subtype: Option<&str>) -> Self {
        match subtype {
            Some("error") => FinishSignal::Overwrite(FinishReason::Error),
            Some("success") => FinishSignal::FillIfUnknown(FinishReason::Stop),
            _ => FinishSignal::FillIfUnknown(FinishReason::Other),
        }
    }
}

impl FinishReason {
    /// Fold one signal into the current value. Never yields `Unknown` once
    /// a concrete value is set.
    #[must_use]
    pub fn apply(self, signal: FinishSignal) -> Self {
        match signal {
            FinishSignal::Overwrite(FinishReason::Unknown) => self,
            FinishSignal::Overwrite(reason) => reason,
            FinishSignal::FillIfUnknown(reason) if self == FinishReason::Unknown => reason,
            FinishSignal::FillIfUnknown(_) => self,
        }
    }
}

/// Resolve a whole ordered signal sequence, starting from `Unknown`.
#[must_use]
pub fn resolve<I>(signals: I) -> FinishReason
where
    I: IntoIterator<Item = FinishSignal>,
{
    signals
        .into_iter()
        .fold(FinishReason::Unknown, FinishReason::apply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop_reason(value: &str) -> FinishSignal {
        FinishSignal::from_stop_reason(value).expect("known stop reason")
    }

    #[test]
    fn test_no_signals_is_unknown() {
        assert_eq!(resolve([]), FinishReason::Unknown);
    }

    #[test]
    fn test_last_overwrite_wins() {
        let signals = [
            stop_reason("tool_use"),
            FinishSignal::PARSE_FAILURE,
            stop_reason("end_turn"),
        ];
        assert_eq!(resolve(signals), FinishReason::Stop);
    }

    #[test]
    fn test_overwrite_beats_earlier_fill() {
        let signals = [FinishSignal::MESSAGE_STOP, stop_reason("tool_use")];
        assert_eq!(resolve(signals), FinishReason::ToolCalls);
    }

    #[test]
    fn test_fill_does_not_replace_overwrite() {
        let signals = [
            FinishSignal::PARSE_FAILURE,
            FinishSignal::MESSAGE_STOP,
            FinishSignal::from_result_subtype(Some("success")),
        ];
        assert_eq!(resolve(signals), FinishReason::Error);
    }

    #[test]
    fn test_first_fill_wins_without_overwrite() {
        let signals = [
            FinishSignal::from_result_subtype(Some("interrupted")),
            FinishSignal::MESSAGE_STOP,
        ];
        assert_eq!(resolve(signals), FinishReason::Other);
    }

    #[test]
    fn test_unknown_stop_reason_is_ignored() {
        assert_eq!(FinishSignal::from_stop_reason("max_tokens"), None);
        assert_eq!(FinishSignal::from_stop_reason("pause_turn"), None);
    }

    #[test]
    fn test_result_subtypes() {
        assert_eq!(
            FinishSignal::from_result_subtype(Some("error")),
            FinishSignal::Overwrite(FinishReason::Error)
        );
        assert_eq!(
            FinishSignal::from_result_subtype(None),
            FinishSignal::FillIfUnknown(FinishReason::Other)
        );
    }

    #[test]
    fn test_overwrite_with_unknown_never_resets() {
        let reason = FinishReason::Stop.apply(FinishSignal::Overwrite(FinishReason::Unknown));
        assert_eq!(reason, FinishReason::Stop);
    }
}
