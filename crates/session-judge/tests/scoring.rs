use menuprobe_core_types::{diagnostics, BrowserAction, History, NoteTag};
use session_judge::{extract_signals, ScoreWeights, Scorer, SignalVector};

#[test]
fn item_added_then_precheckout_stop_scores_five() {
    let mut history = History::new();
    history.advance();
    history.push_action(BrowserAction::Click {
        selector: "#add-to-cart".to_string(),
    });
    history.advance();
    history.push_action(BrowserAction::Note {
        tag: NoteTag::MilestoneItemAdded,
        detail: String::new(),
    });
    history.info(diagnostics::STOP_PRECHECKOUT);

    let signals = extract_signals(&history);
    assert!(signals.m_item);
    assert!(signals.prechk_stop);
    assert_eq!(signals.errors, 0);
    assert_eq!(signals.severe_notes, 0);

    let scorer = Scorer::default();
    for persona in ["U-01", "D-02", "V-03", "P-17", "anon"] {
        assert_eq!(scorer.score(persona, &signals), 5, "{persona}");
    }
}

#[test]
fn three_timeouts_without_milestones_score_at_most_three() {
    let mut history = History::new();
    for selector in ["#menu", "#search", "#cart"] {
        history.advance();
        history.warn(diagnostics::timeout(selector));
    }

    let signals = extract_signals(&history);
    assert_eq!(signals.timeouts, 3);
    assert!(!signals.m_item && !signals.m_cart && !signals.m_review);

    let scorer = Scorer::default();
    for idx in 0..200 {
        let persona = format!("P-{idx:02}");
        assert!(scorer.score(&persona, &signals) <= 3, "{persona}");
    }
}

#[test]
fn extraction_is_pure() {
    let mut history = History::new();
    history.advance();
    history.push_action(BrowserAction::Wait { ms: 4_000 });
    history.warn(diagnostics::missing_target("#x"));
    history.push_action(BrowserAction::Note {
        tag: NoteTag::FeeNotTransparent,
        detail: "service fee appears at review".to_string(),
    });
    assert_eq!(extract_signals(&history), extract_signals(&history.clone()));
}

#[test]
fn scores_stay_in_range_for_extreme_vectors() {
    let extremes = [
        SignalVector::default(),
        SignalVector {
            errors: u32::MAX,
            warnings: u32::MAX,
            timeouts: u32::MAX,
            long_waits: u32::MAX,
            steps: u32::MAX,
            severe_notes: u32::MAX,
            budget_exceeded: true,
            ..SignalVector::default()
        },
        SignalVector {
            m_item: true,
            m_cart: true,
            m_review: true,
            prechk_stop: true,
            budget_met: true,
            ..SignalVector::default()
        },
    ];
    let weight_sets = [
        ScoreWeights::default(),
        ScoreWeights {
            bias: 100.0,
            review_bonus: 1e9,
            ..ScoreWeights::default()
        },
        ScoreWeights {
            bias: -100.0,
            jitter: f64::INFINITY,
            ..ScoreWeights::default()
        },
    ];
    for weights in weight_sets {
        let scorer = Scorer::new(weights);
        for signals in &extremes {
            let score = scorer.score("X-99", signals);
            assert!((1..=5).contains(&score), "{score} for {signals:?}");
        }
    }
}

#[test]
fn same_inputs_same_score_across_scorers() {
    let signals = SignalVector {
        m_item: true,
        m_cart: true,
        timeouts: 1,
        budget_met: true,
        steps: 12,
        ..SignalVector::default()
    };
    let first = Scorer::new(ScoreWeights::default()).score("D-05", &signals);
    let second = Scorer::new(ScoreWeights::default()).score("D-05", &signals);
    assert_eq!(first, second);
}
