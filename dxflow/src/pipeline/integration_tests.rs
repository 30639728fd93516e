//! End-to-end orchestration scenarios against stubbed stage services.

#[cfg(test)]
mod tests {
    use crate::client::MockStageClient;
    use crate::config::{ApiConfiguration, ConfigurationGate, OcrModel};
    use crate::context::RunId;
    use crate::core::{OcrResult, PipelinePhase, PipelineStage};
    use crate::errors::{ClientError, MissingInput, PipelineError};
    use crate::events::{BroadcastEventSink, CollectingEventSink, FanoutEventSink};
    use crate::pipeline::PipelineOrchestrator;
    use crate::testing::{fixtures, StubCall, StubStageClient};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn azure() -> Option<ApiConfiguration> {
        Some(ApiConfiguration::new(OcrModel::Azure))
    }

    fn orchestrator(client: &Arc<StubStageClient>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(client.clone())
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let client = Arc::new(StubStageClient::new().with_run_ids(["run-42"]));
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = orchestrator(&client).with_event_sink(sink.clone());

        let outcome = orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap();

        assert_eq!(outcome.notes, fixtures::medical_notes());
        assert_eq!(outcome.ocr, fixtures::ocr_result());
        assert_eq!(outcome.run_id, RunId::from("run-42"));
        assert_eq!(outcome.document.locator(), fixtures::DOWNLOAD_URL);
        assert_eq!(outcome.document.bytes(), fixtures::sample_document().bytes());

        let state = orchestrator.state();
        assert_eq!(state.phase, PipelinePhase::Done);
        assert_eq!(state.progress, PipelineStage::MAX_PROGRESS);
        assert_eq!(state.terminal_error, None);

        for call in StubCall::ALL {
            assert_eq!(client.call_count(call), 1, "{call:?} should run exactly once");
        }
        assert_eq!(client.calls(), StubCall::ALL.to_vec());
        assert!(client
            .seen_run_ids()
            .iter()
            .all(|id| id.as_str() == "run-42"));
        assert_eq!(client.last_ocr_model(), Some(OcrModel::Azure));
        assert_eq!(client.last_paginated_page_count(), Some(2));

        let types = sink.event_types();
        assert_eq!(types.first().map(String::as_str), Some("pipeline.started"));
        assert_eq!(types.last().map(String::as_str), Some("pipeline.completed"));
    }

    #[tokio::test]
    async fn test_redaction_failure_stops_the_chain() {
        let client = Arc::new(
            StubStageClient::new().fail_on(StubCall::PiiRedaction, "service timeout"),
        );
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = orchestrator(&client).with_event_sink(sink.clone());

        let err = orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::RedactionFailed(_)));
        assert_eq!(err.to_string(), "service timeout");

        assert_eq!(client.call_count(StubCall::Ocr), 1);
        assert_eq!(client.call_count(StubCall::PiiRedaction), 1);
        for call in StubCall::PiiRedaction.later() {
            assert_eq!(client.call_count(*call), 0, "{call:?} must not run");
        }

        let state = orchestrator.state();
        assert_eq!(state.phase, PipelinePhase::Failed);
        assert_eq!(state.progress, 2);
        assert_eq!(state.terminal_error.as_deref(), Some("service timeout"));

        let failed = sink.events_of_type("pipeline.failed");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].progress(), Some(2));
        assert_eq!(sink.events_of_type("stage.failed")[0].stage(), Some("pii_redaction"));
        assert!(sink.events_of_type("pipeline.completed").is_empty());
    }

    #[tokio::test]
    async fn test_every_stage_failure_maps_to_its_kind() {
        let cases = [
            (StubCall::InitializeRun, "RunInitializationFailed", 0),
            (StubCall::UploadFile, "UploadFailed", 1),
            (StubCall::FetchDocument, "UploadFailed", 1),
            (StubCall::Ocr, "OCRFailed", 1),
            (StubCall::PiiRedaction, "RedactionFailed", 2),
            (StubCall::DiseaseExtraction, "ExtractionFailed", 3),
            (StubCall::IcdMapping, "MappingFailed", 4),
            (StubCall::FillIcdCodes, "FillFailed", 5),
            (StubCall::HccMapping, "RiskMappingFailed", 6),
            (StubCall::PaginatedMedicalNotes, "PaginationFailed", 7),
        ];

        for (call, kind, progress) in cases {
            let client = Arc::new(StubStageClient::new().fail_on(call, "boom"));
            let orchestrator = orchestrator(&client);

            let err = orchestrator
                .execute(Some(fixtures::sample_document()), azure())
                .await
                .unwrap_err();

            assert_eq!(err.kind(), kind, "failure injected at {call:?}");
            assert_eq!(err.to_string(), "boom");
            assert_eq!(orchestrator.progress(), progress, "progress at {call:?}");
            for later in call.later() {
                assert_eq!(client.call_count(*later), 0, "{later:?} ran after {call:?}");
            }
        }
    }

    #[tokio::test]
    async fn test_download_failure_message() {
        let client = Arc::new(StubStageClient::new().fail_with(
            StubCall::FetchDocument,
            ClientError::status(403, "Failed to download file"),
        ));
        let orchestrator = orchestrator(&client);

        let err = orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UploadFailed(_)));
        assert_eq!(err.to_string(), "Failed to download file");
        assert_eq!(client.call_count(StubCall::Ocr), 0);
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_calls() {
        let client = Arc::new(StubStageClient::new());
        let orchestrator = orchestrator(&client);

        let err = orchestrator.execute(None, azure()).await.unwrap_err();

        assert!(matches!(err, PipelineError::MissingInput(MissingInput::File)));
        assert_eq!(err.to_string(), "Please select a file first");
        assert_eq!(client.total_calls(), 0);
        assert_eq!(orchestrator.state().phase, PipelinePhase::Idle);
    }

    #[tokio::test]
    async fn test_missing_configuration_makes_no_calls() {
        let client = Arc::new(StubStageClient::new());
        let orchestrator = orchestrator(&client);

        let err = orchestrator
            .execute(Some(fixtures::sample_document()), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::MissingInput(MissingInput::Configuration)
        ));
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfirmed_gate_is_missing_configuration() {
        let client = Arc::new(StubStageClient::new());
        let orchestrator = orchestrator(&client);
        let mut gate = ConfigurationGate::new();
        gate.open();
        gate.select(OcrModel::CustomVlm);
        gate.cancel();

        let err = orchestrator
            .execute_with_gate(Some(fixtures::sample_document()), &gate)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingInput(MissingInput::Configuration)
        ));

        gate.open();
        gate.select(OcrModel::CustomVlm);
        gate.confirm();
        orchestrator
            .execute_with_gate(Some(fixtures::sample_document()), &gate)
            .await
            .unwrap();
        assert_eq!(client.last_ocr_model(), Some(OcrModel::CustomVlm));
    }

    #[tokio::test]
    async fn test_reexecution_uses_fresh_run_id() {
        let client = Arc::new(
            StubStageClient::new()
                .with_run_ids(["run-1", "run-2"])
                .fail_on(StubCall::HccMapping, "risk service down"),
        );
        let orchestrator = orchestrator(&client);

        let first = orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await;
        assert!(first.is_err());
        assert_eq!(orchestrator.state().run_id, Some(RunId::from("run-1")));

        let second = orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await;
        assert!(second.is_err());

        let state = orchestrator.state();
        assert_eq!(state.run_id, Some(RunId::from("run-2")));
        assert_eq!(state.progress, 6);
        assert_eq!(client.call_count(StubCall::InitializeRun), 2);
    }

    #[tokio::test]
    async fn test_success_after_failure_starts_from_zero() {
        let client = Arc::new(StubStageClient::new());
        let failing = Arc::new(StubStageClient::new().fail_on(StubCall::Ocr, "bad scan"));
        let sink = Arc::new(CollectingEventSink::new());

        let orchestrator = orchestrator(&failing).with_event_sink(sink.clone());
        orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap_err();

        let orchestrator = PipelineOrchestrator::new(client.clone()).with_event_sink(sink.clone());
        sink.clear();
        orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap();

        let progress: Vec<u8> = sink
            .events_of_type("stage.completed")
            .iter()
            .filter_map(crate::core::PipelineEvent::progress)
            .collect();
        assert_eq!(progress, vec![1, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_for_observers() {
        let client = Arc::new(StubStageClient::new().with_delay(Duration::from_millis(2)));
        let orchestrator = orchestrator(&client);
        let mut rx = orchestrator.subscribe();

        let observer = tokio::spawn(async move {
            let mut seen = vec![rx.borrow_and_update().progress];
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                seen.push(state.progress);
                if state.is_terminal() {
                    break;
                }
            }
            seen
        });

        orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap();

        let seen = observer.await.unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {seen:?}");
        assert_eq!(seen.last().copied(), Some(PipelineStage::MAX_PROGRESS));
    }

    #[tokio::test]
    async fn test_broadcast_subscribers_see_failure() {
        let client = Arc::new(StubStageClient::new().fail_on(StubCall::DiseaseExtraction, "nlp down"));
        let broadcast = Arc::new(BroadcastEventSink::new(64));
        let collecting = Arc::new(CollectingEventSink::new());
        let fanout = FanoutEventSink::new()
            .with_sink(broadcast.clone())
            .with_sink(collecting.clone());
        let orchestrator = orchestrator(&client).with_event_sink(Arc::new(fanout));
        let mut rx = broadcast.subscribe();

        orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap_err();

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event.event_type);
        }
        assert_eq!(received, collecting.event_types());
        assert_eq!(received.last().map(String::as_str), Some("pipeline.failed"));
    }

    #[test]
    fn test_blocking_execution() {
        let client = Arc::new(StubStageClient::new().with_run_ids(["run-sync"]));
        let orchestrator = orchestrator(&client);

        let outcome = tokio_test::block_on(
            orchestrator.execute(Some(fixtures::sample_document()), azure()),
        )
        .unwrap();

        assert_eq!(outcome.run_id.as_str(), "run-sync");
    }

    #[tokio::test]
    async fn test_strict_mock_never_calls_later_stages() {
        let mut mock = MockStageClient::new();
        mock.expect_initialize_run()
            .times(1)
            .returning(|| Ok(RunId::new("run-mock")));
        mock.expect_upload_file()
            .times(1)
            .returning(|_, _| Ok(fixtures::DOWNLOAD_URL.to_string()));
        mock.expect_fetch_document()
            .times(1)
            .returning(|_| Ok(b"%PDF-1.4".to_vec()));
        mock.expect_process_ocr()
            .times(1)
            .returning(|_, run_id, _| {
                assert_eq!(run_id.as_str(), "run-mock");
                Ok(fixtures::ocr_result())
            });
        mock.expect_process_pii_redaction()
            .times(1)
            .returning(|_, _| Err(ClientError::remote("service timeout")));
        mock.expect_process_disease_extraction().times(0);
        mock.expect_process_icd_mapping().times(0);
        mock.expect_process_fill_icd_codes().times(0);
        mock.expect_process_hcc_mapping().times(0);
        mock.expect_process_paginated_medical_notes().times(0);

        let orchestrator = PipelineOrchestrator::new(Arc::new(mock));
        let err = orchestrator
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "service timeout");
        assert_eq!(orchestrator.progress(), 2);
    }

    #[tokio::test]
    async fn test_ocr_pages_reach_note_assembly_unchanged() {
        let raw_pages = serde_json::json!([
            {"page": 1, "text": "Hypertension.", "confidence": 0.91, "lines": [{"text": "Hypertension."}]},
            {"text": "COPD, stable."},
            "page three as a bare string"
        ]);
        let ocr_response = serde_json::json!({
            "file_content": "Hypertension. COPD, stable.",
            "pages": raw_pages,
        });
        let ocr: OcrResult = serde_json::from_value(ocr_response).unwrap();
        let client = Arc::new(StubStageClient::new().with_ocr_result(ocr.clone()));

        let outcome = orchestrator(&client)
            .execute(Some(fixtures::sample_document()), azure())
            .await
            .unwrap();

        let sent = client.last_paginated_pages().unwrap();
        assert_eq!(sent, ocr.pages);
        assert_eq!(serde_json::to_value(&sent).unwrap(), raw_pages);
        assert_eq!(serde_json::to_value(&outcome.ocr.pages).unwrap(), raw_pages);
    }
}
