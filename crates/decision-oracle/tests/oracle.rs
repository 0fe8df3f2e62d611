use decision_oracle::{
    ActionContext, DecisionOracle, OracleError, Purpose, ScriptedBackend,
};
use menuprobe_core_types::{History, Persona, ProposedAction};
use std::sync::Arc;

fn context() -> ActionContext {
    ActionContext {
        step: 3,
        step_ceiling: 60,
        persona_summary: "id=D-01 | diet=vegan".to_string(),
        dom_digest: "<main>Menu</main>".to_string(),
        recent: vec!["#2 {\"action\":\"wait\",\"ms\":900}".to_string()],
    }
}

#[tokio::test]
async fn propose_action_decodes_fenced_reply() {
    let backend = Arc::new(ScriptedBackend::new().reply(
        Purpose::Action,
        "```json\n{\"action\":\"type\",\"selector\":\"#search\",\"text\":\"ramen\"}\n```",
    ));
    let oracle = DecisionOracle::single(backend.clone());

    let action = oracle.propose_action(&context()).await.unwrap();
    assert_eq!(
        action,
        ProposedAction::Type {
            selector: Some("#search".to_string()),
            text: Some("ramen".to_string()),
        }
    );

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].user.contains("Step 3 of at most 60"));
    assert!(requests[0].json);
}

#[tokio::test]
async fn transport_errors_pass_through() {
    let backend = Arc::new(
        ScriptedBackend::new().fail(Purpose::Action, OracleError::transport("connection reset")),
    );
    let oracle = DecisionOracle::single(backend);
    let err = oracle.propose_action(&context()).await.unwrap_err();
    assert!(matches!(err, OracleError::Transport(_)));
}

#[tokio::test]
async fn analysis_requires_markdown() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(Purpose::Analysis, r###"{"score":"4","description":"Smooth run","markdown":"## What Worked Well\n- quick"}"###)
            .reply(Purpose::Analysis, r#"{"score":4,"description":"no body"}"#),
    );
    let oracle = DecisionOracle::single(backend);
    let persona = Persona::new("U-01");
    let history = History::new();

    let analysis = oracle.analyze(&persona, &history).await.unwrap();
    assert_eq!(analysis.score, Some(4.0));
    assert_eq!(analysis.description, "Smooth run");

    let err = oracle.analyze(&persona, &history).await.unwrap_err();
    assert!(err.is_protocol());
}

#[tokio::test]
async fn suggestions_carry_forbidden_list() {
    let backend = Arc::new(ScriptedBackend::new().reply(
        Purpose::Suggestions,
        r#"{"suggestions":["Pin the allergen legend above the menu", "  "]}"#,
    ));
    let oracle = DecisionOracle::single(backend.clone());
    let forbidden = vec!["Add a vegan filter".to_string()];

    let suggestions = oracle
        .suggest_improvements(&Persona::new("D-02"), 2, &forbidden)
        .await
        .unwrap();
    assert_eq!(suggestions, vec!["Pin the allergen legend above the menu"]);
    assert!(backend.requests()[0].user.contains("- Add a vegan filter"));
}

#[tokio::test]
async fn exhausted_script_is_unavailable() {
    let oracle = DecisionOracle::single(Arc::new(ScriptedBackend::new()));
    let err = oracle.rewrite_report("## What Worked Well", &[]).await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable(_)));
}
