use ferrochain_core::{CompletionLlm, CompletionRequest, FakeListLlm, FerroError};

#[tokio::test]
async fn replays_responses_in_order_and_records_requests() {
    let llm = FakeListLlm::new(["first", "second"]);

    let one = llm
        .complete(CompletionRequest::new("p1").with_stop(vec!["STOP".to_string()]))
        .await
        .unwrap();
    let two = llm.complete(CompletionRequest::new("p2")).await.unwrap();

    assert_eq!(one, "first");
    assert_eq!(two, "second");
    assert_eq!(llm.call_count(), 2);
    assert_eq!(llm.prompts(), vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(llm.requests()[0].stop, vec!["STOP".to_string()]);
}

#[tokio::test]
async fn exhausted_script_is_a_provider_error() {
    let llm = FakeListLlm::new(Vec::<String>::new());
    let err = llm.complete(CompletionRequest::new("p")).await.unwrap_err();
    assert!(matches!(err, FerroError::LlmProvider(_)));
    assert_eq!(llm.call_count(), 1);
}
