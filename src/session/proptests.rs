//! Property-based tests for the session state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::answer::{AnswerError, AnswerErrorKind};
use crate::voice::VoiceError;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_utterance_id() -> impl Strategy<Value = UtteranceId> {
    (1u128..6).prop_map(UtteranceId::from_u128)
}

fn arb_answer_error() -> impl Strategy<Value = AnswerError> {
    (
        prop_oneof![
            Just(AnswerErrorKind::NetworkFailure),
            Just(AnswerErrorKind::MalformedResponse),
        ],
        "[a-z ]{1,20}",
    )
        .prop_map(|(kind, message)| AnswerError::new(kind, message))
}

fn arb_voice_error() -> impl Strategy<Value = VoiceError> {
    prop_oneof![
        Just(VoiceError::NoSpeechDetected),
        "[a-z ]{1,20}".prop_map(VoiceError::RecognitionFailed),
        "[a-z ]{1,20}".prop_map(VoiceError::SynthesisUnavailable),
    ]
}

fn arb_query_status() -> impl Strategy<Value = QueryStatus> {
    prop_oneof![
        Just(QueryStatus::Idle),
        Just(QueryStatus::Pending),
        Just(QueryStatus::Succeeded),
        arb_answer_error().prop_map(|e| QueryStatus::Failed {
            error_kind: e.kind,
            message: e.message,
        }),
    ]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    (
        "[a-z ]{0,20}",
        "[a-zA-Z .]{0,30}",
        arb_query_status(),
        any::<bool>(),
        proptest::option::of(arb_utterance_id()),
        0u64..10,
    )
        .prop_map(
            |(query_text, answer_text, query_status, listening, utterance, request_epoch)| {
                SessionState {
                    query_text,
                    answer_text,
                    query_status,
                    voice_input: if listening {
                        VoiceInputStatus::Listening
                    } else {
                        VoiceInputStatus::Inactive
                    },
                    voice_output: utterance.map_or(VoiceOutputStatus::Silent, |utterance_id| {
                        VoiceOutputStatus::Speaking { utterance_id }
                    }),
                    request_epoch,
                }
            },
        )
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| Event::QueryTextChanged { text }),
        Just(Event::SubmitRequested),
        Just(Event::VoiceInputRequested),
        arb_utterance_id().prop_map(|utterance_id| Event::SpeakRequested { utterance_id }),
        Just(Event::StopSpeakingRequested),
        (
            0u64..10,
            prop_oneof![
                "[a-zA-Z .]{0,30}".prop_map(Ok::<String, AnswerError>),
                arb_answer_error().prop_map(Err),
            ]
        )
            .prop_map(|(epoch, outcome)| Event::AnswerResolved { epoch, outcome }),
        prop_oneof![
            "[a-z ]{0,20}".prop_map(Ok::<String, VoiceError>),
            arb_voice_error().prop_map(Err),
        ]
        .prop_map(|outcome| Event::RecognitionFinished { outcome }),
        (
            arb_utterance_id(),
            prop_oneof![Just(Ok::<(), VoiceError>(())), arb_voice_error().prop_map(Err)]
        )
            .prop_map(|(utterance_id, outcome)| Event::UtteranceFinished {
                utterance_id,
                outcome
            }),
    ]
}

fn resolve(state: &SessionState, epoch: u64, answer: &str) -> SessionState {
    transition(
        state,
        Event::AnswerResolved {
            epoch,
            outcome: Ok(answer.to_string()),
        },
    )
    .unwrap()
    .new_state
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: epoch never decreases, answer only changes on a current
    // successful reply, and every real change is published
    #[test]
    fn prop_transitions_preserve_invariants(
        events in proptest::collection::vec(arb_event(), 0..30)
    ) {
        let mut state = SessionState::default();

        for event in events {
            let accepted_answer = match &event {
                Event::AnswerResolved { epoch, outcome: Ok(answer) }
                    if *epoch == state.request_epoch && state.is_pending() => Some(answer.clone()),
                _ => None,
            };

            let Ok(result) = transition(&state, event) else {
                continue;
            };
            let next = result.new_state;

            prop_assert!(next.request_epoch >= state.request_epoch);
            match accepted_answer {
                Some(answer) => prop_assert_eq!(&next.answer_text, &answer),
                None => prop_assert_eq!(&next.answer_text, &state.answer_text),
            }
            if next != state {
                prop_assert!(result.effects.contains(&Effect::PublishSnapshot));
            }
            if result.effects.is_empty() {
                prop_assert_eq!(&next, &state);
            }
            let starts = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::StartUtterance { .. }))
                .count();
            prop_assert!(starts <= 1);

            state = next;
        }
    }

    // Invariant 2: for submissions A then B, B's answer always wins
    #[test]
    fn prop_epoch_race_latest_submission_wins(
        query_a in "[a-z]{1,10}",
        query_b in "[a-z]{1,10}",
        answer_a in "[a-z]{1,10}",
        answer_b in "[A-Z]{1,10}",
        a_first in any::<bool>(),
    ) {
        let state = SessionState { query_text: query_a, ..SessionState::default() };
        let after_a = transition(&state, Event::SubmitRequested).unwrap().new_state;
        let epoch_a = after_a.request_epoch;

        let typed = transition(&after_a, Event::QueryTextChanged { text: query_b })
            .unwrap()
            .new_state;
        let after_b = transition(&typed, Event::SubmitRequested).unwrap().new_state;
        let epoch_b = after_b.request_epoch;
        prop_assert!(epoch_b > epoch_a);

        let end = if a_first {
            resolve(&resolve(&after_b, epoch_a, &answer_a), epoch_b, &answer_b)
        } else {
            resolve(&resolve(&after_b, epoch_b, &answer_b), epoch_a, &answer_a)
        };

        prop_assert_eq!(end.answer_text, answer_b);
        prop_assert_eq!(end.query_status, QueryStatus::Succeeded);
    }

    // Invariant 3: replies for older epochs never touch the state
    #[test]
    fn prop_stale_replies_are_inert(
        state in arb_state(),
        lag in 1u64..5,
        outcome in prop_oneof![
            "[a-z]{0,10}".prop_map(Ok::<String, AnswerError>),
            arb_answer_error().prop_map(Err),
        ],
    ) {
        let stale = state.request_epoch.saturating_sub(lag);
        prop_assume!(stale != state.request_epoch);

        let result = transition(&state, Event::AnswerResolved { epoch: stale, outcome }).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert!(result.effects.is_empty());
    }

    // Invariant 4: a failed reply keeps the previous answer and flags failure
    #[test]
    fn prop_failure_preserves_prior_answer(
        previous in "[a-zA-Z ]{1,30}",
        error in arb_answer_error(),
    ) {
        let state = SessionState {
            query_text: "q".to_string(),
            answer_text: previous.clone(),
            ..SessionState::default()
        };
        let pending = transition(&state, Event::SubmitRequested).unwrap().new_state;
        let epoch = pending.request_epoch;
        let failed = transition(&pending, Event::AnswerResolved { epoch, outcome: Err(error.clone()) })
            .unwrap()
            .new_state;

        prop_assert_eq!(failed.answer_text, previous);
        prop_assert_eq!(
            failed.query_status,
            QueryStatus::Failed { error_kind: error.kind, message: error.message }
        );
    }

    // Invariant 5: repeated speak requests leave exactly the newest handle,
    // tearing down the previous one each time
    #[test]
    fn prop_speak_keeps_single_newest_handle(
        ids in proptest::collection::vec(arb_utterance_id(), 1..8)
    ) {
        let mut state = SessionState {
            answer_text: "Use a loop...".to_string(),
            ..SessionState::default()
        };

        for id in ids {
            let previous = state.active_utterance_id();
            let result = transition(&state, Event::SpeakRequested { utterance_id: id }).unwrap();

            let cancels: Vec<_> = result
                .effects
                .iter()
                .filter_map(|e| match e {
                    Effect::CancelUtterance { utterance_id } => Some(*utterance_id),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(cancels, previous.into_iter().collect::<Vec<_>>());
            prop_assert_eq!(result.new_state.active_utterance_id(), Some(id));

            state = result.new_state;
        }
    }

    // Invariant 6: recognition never changes query status or epoch
    #[test]
    fn prop_voice_input_never_submits(
        state in arb_state(),
        outcome in prop_oneof![
            "[a-z ]{0,20}".prop_map(Ok::<String, VoiceError>),
            arb_voice_error().prop_map(Err),
        ],
    ) {
        let listening = SessionState { voice_input: VoiceInputStatus::Listening, ..state };
        let result = transition(&listening, Event::RecognitionFinished { outcome }).unwrap();

        prop_assert_eq!(&result.new_state.query_status, &listening.query_status);
        prop_assert_eq!(result.new_state.request_epoch, listening.request_epoch);
        prop_assert_eq!(result.new_state.voice_input, VoiceInputStatus::Inactive);
        let requested = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::RequestAnswer { .. }));
        prop_assert!(!requested);
    }

    // Invariant 7: stop while silent and empty submit are pure no-ops
    #[test]
    fn prop_noop_requests_change_nothing(state in arb_state()) {
        let silent = SessionState { voice_output: VoiceOutputStatus::Silent, ..state.clone() };
        let stop = transition(&silent, Event::StopSpeakingRequested).unwrap();
        prop_assert_eq!(&stop.new_state, &silent);
        prop_assert!(stop.effects.is_empty());

        let empty = SessionState { query_text: String::new(), ..state };
        let submit = transition(&empty, Event::SubmitRequested).unwrap();
        prop_assert_eq!(&submit.new_state, &empty);
        prop_assert!(submit.effects.is_empty());
    }
}
