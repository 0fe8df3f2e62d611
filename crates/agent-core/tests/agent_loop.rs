use agent_core::{
    AgentLoopConfig, AgentLoopController, ScriptedPage, SessionStatus,
};
use decision_oracle::{DecisionOracle, OracleError, Purpose, ScriptedBackend};
use menuprobe_core_types::{
    diagnostics, BrowserAction, DiagnosticLevel, History, NoteTag, Persona,
};
use std::sync::Arc;

const MENU: &str = "<main><h1>Menu</h1><button id=add-to-cart>Add</button></main>";

fn persona() -> Persona {
    let mut persona = Persona::new("D-01");
    persona.diet = "vegan".to_string();
    persona.goal = "Order a vegan ramen (Delivery, under $12)".to_string();
    persona
}

fn controller(backend: ScriptedBackend, config: AgentLoopConfig) -> AgentLoopController {
    AgentLoopController::new(config, DecisionOracle::single(Arc::new(backend)))
}

fn messages(history: &History, level: DiagnosticLevel) -> Vec<String> {
    history
        .diagnostics()
        .filter(|record| record.level == level)
        .map(|record| record.message.clone())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn reaches_review_and_stops_before_checkout() {
    let backend = ScriptedBackend::new()
        .reply(Purpose::Action, r##"{"action":"click","selector":"#add-to-cart"}"##)
        .reply(
            Purpose::Action,
            r#"{"action":"note","tag":"milestone_item_added","detail":"ramen in cart"}"#,
        )
        .reply(Purpose::Action, r##"{"action":"click","selector":"#view-cart"}"##);
    let page = ScriptedPage::new(MENU)
        .element("#add-to-cart", "Add")
        .element("#view-cart", "View cart")
        .on_click("#view-cart", "<h1>Review order</h1><button>Place order</button>");

    let outcome = controller(backend, AgentLoopConfig::default())
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::ReachedReview);
    assert!(outcome.reached_review);
    assert_eq!(page.clicks(), vec!["#add-to-cart", "#view-cart"]);
    assert!(outcome
        .history
        .actions()
        .any(|record| record.action.note_tag() == Some(NoteTag::MilestoneItemAdded)));
    let info = messages(&outcome.history, DiagnosticLevel::Info);
    assert!(info.iter().any(|msg| diagnostics::is_precheckout_stop(msg)));
}

#[tokio::test(start_paused = true)]
async fn finalization_is_never_executed() {
    let backend = ScriptedBackend::new().repeat(
        Purpose::Action,
        r##"{"action":"click","selector":"#place-order"}"##,
    );
    let page = ScriptedPage::new(MENU).element("#place-order", "Place order");

    let outcome = controller(backend, AgentLoopConfig::default())
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::SafetyHalt);
    assert!(outcome.status.is_error());
    assert!(page.clicks().is_empty());
    assert_eq!(outcome.history.action_count(), 0);
    let errors = messages(&outcome.history, DiagnosticLevel::Error);
    assert!(errors[0].starts_with(diagnostics::SAFETY_HALT));
}

#[tokio::test(start_paused = true)]
async fn finalization_detected_by_visible_text() {
    let backend = ScriptedBackend::new()
        .repeat(Purpose::Action, r##"{"action":"click","selector":"#cta"}"##);
    let page = ScriptedPage::new(MENU).element("#cta", "Pay now  $11.40");

    let outcome = controller(backend, AgentLoopConfig::default())
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::SafetyHalt);
    assert!(page.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unreadable_target_label_halts_instead_of_clicking() {
    let backend = ScriptedBackend::new()
        .repeat(Purpose::Action, r##"{"action":"click","selector":"#primary-cta"}"##);
    let page = ScriptedPage::new("<main><button id=primary-cta>Place order</button></main>")
        .element("#primary-cta", "Place order")
        .unreadable_text();
    let config = AgentLoopConfig::new()
        .step_ceiling(4)
        .stop_markers(Vec::<String>::new());

    let outcome = controller(backend, config)
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::SafetyHalt);
    assert!(page.clicks().is_empty());
    assert_eq!(outcome.history.action_count(), 0);
    let errors = messages(&outcome.history, DiagnosticLevel::Error);
    assert!(errors[0].contains("label unreadable"));
}

#[tokio::test(start_paused = true)]
async fn missing_targets_and_timeouts_degrade_to_warnings() {
    let backend = ScriptedBackend::new()
        .reply(Purpose::Action, r##"{"action":"click","selector":"#missing"}"##)
        .reply(Purpose::Action, r##"{"action":"click","selector":"#slow"}"##)
        .reply(Purpose::Action, r#"{"action":"click"}"#)
        .reply(Purpose::Action, r#"{"action":"note","tag":"vibes"}"#)
        .repeat(Purpose::Action, r#"{"action":"wait","ms":250}"#);
    let page = ScriptedPage::new(MENU).stalled_element("#slow", "Specials");

    let outcome = controller(backend, AgentLoopConfig::new().step_ceiling(8))
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::StepCeiling);
    let warnings = messages(&outcome.history, DiagnosticLevel::Warn);
    assert!(warnings.contains(&diagnostics::missing_target("#missing")));
    assert!(warnings.contains(&diagnostics::timeout("#slow")));
    assert!(warnings.contains(&diagnostics::missing_target("<none>")));
    assert!(warnings.iter().any(|msg| msg.contains("unknown note tag 'vibes'")));
    assert!(messages(&outcome.history, DiagnosticLevel::Error).is_empty());
    assert_eq!(
        messages(&outcome.history, DiagnosticLevel::Info).last().map(String::as_str),
        Some(diagnostics::STEP_CEILING)
    );
}

#[tokio::test(start_paused = true)]
async fn unparsable_reply_terminates_with_error() {
    let backend =
        ScriptedBackend::new().reply(Purpose::Action, "Let me think about the menu first.");
    let page = ScriptedPage::new(MENU);

    let outcome = controller(backend, AgentLoopConfig::default())
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    assert_eq!(messages(&outcome.history, DiagnosticLevel::Error).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_action_kind_terminates_with_error() {
    let backend = ScriptedBackend::new()
        .reply(Purpose::Action, r#"{"action":"scroll","px":400}"#);
    let page = ScriptedPage::new(MENU);

    let outcome = controller(backend, AgentLoopConfig::default())
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    assert!(messages(&outcome.history, DiagnosticLevel::Error)[0].contains("scroll"));
}

#[tokio::test(start_paused = true)]
async fn repeated_oracle_outages_abort_the_session() {
    let backend = ScriptedBackend::new()
        .fail(Purpose::Action, OracleError::transport("reset"))
        .fail(Purpose::Action, OracleError::transport("reset"))
        .reply(Purpose::Action, r#"{"action":"wait","ms":300}"#)
        .fail(Purpose::Action, OracleError::transport("reset"))
        .fail(Purpose::Action, OracleError::transport("reset"))
        .fail(Purpose::Action, OracleError::transport("reset"));
    let page = ScriptedPage::new(MENU);

    let outcome = controller(backend, AgentLoopConfig::default())
        .run(&persona(), &page, History::new())
        .await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    assert_eq!(messages(&outcome.history, DiagnosticLevel::Warn).len(), 5);
    assert_eq!(outcome.history.action_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn waits_are_perturbed_and_polling_is_bounded() {
    let backend = ScriptedBackend::new()
        .reply(Purpose::Action, r#"{"action":"wait","ms":1000}"#)
        .reply(
            Purpose::Action,
            r##"{"action":"wait_for","selector":"#banner","state":"visible"}"##,
        )
        .reply(
            Purpose::Action,
            r##"{"action":"wait_for","selector":"#never","timeout_ms":10000}"##,
        )
        .reply(Purpose::Action, r#"{"action":"wait","ms":99999}"#)
        .repeat(Purpose::Action, r#"{"action":"wait","ms":200}"#);
    let page = ScriptedPage::new(MENU).delayed_element("#banner", "Free delivery", 3);

    let outcome = controller(backend, AgentLoopConfig::new().step_ceiling(9))
        .run(&persona(), &page, History::new())
        .await;

    let recorded: Vec<BrowserAction> = outcome
        .history
        .actions()
        .map(|record| record.action.clone())
        .collect();
    assert_eq!(recorded[0], BrowserAction::Wait { ms: 1300 });
    assert!(matches!(
        &recorded[2],
        BrowserAction::WaitFor { timeout_ms: 1500, .. }
    ));
    assert_eq!(recorded[3], BrowserAction::Wait { ms: 5000 });

    let info = messages(&outcome.history, DiagnosticLevel::Info);
    assert!(info.iter().any(|msg| msg == "wait_for #banner visible after 300ms"));
    assert!(info
        .iter()
        .any(|msg| msg == "wait_for #never not visible within 1500ms"));
    assert!(messages(&outcome.history, DiagnosticLevel::Warn).is_empty());
}
