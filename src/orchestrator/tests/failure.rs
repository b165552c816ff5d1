use super::*;

#[tokio::test]
async fn failed_transfer_sends_exactly_one_failure_message() {
    let rig = create_test_rig(
        FakeMedia {
            payload: b"video-bytes".to_vec(),
            fail: true,
        },
        FakeSwarm::stalling(),
    );
    let mut events = rig.orchestrator.subscribe();

    let handle = rig
        .orchestrator
        .start_job(request(SourceSpec::Media {
            attachment: Some(video()),
        }))
        .await
        .unwrap();
    let job = handle.wait().await.unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert!(job.outputs.is_empty());

    let texts = rig.notifier.sent_texts();
    let failures = texts
        .iter()
        .filter(|t| t.as_str() == finalization::FAILURE_MESSAGE)
        .count();
    assert_eq!(failures, 1);
    assert_eq!(texts.len(), 2, "status message plus failure, got {texts:?}");

    let mut failed = 0;
    while let Ok(event) = events.try_recv() {
        if let Event::JobFailed { error, .. } = event {
            assert!(error.contains("connection reset"));
            failed += 1;
        }
    }
    assert_eq!(failed, 1);

    // Partial output is cleaned up
    let leftovers = std::fs::read_dir(rig.temp_dir.path().join("downloads"))
        .unwrap()
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn http_error_status_fails_the_job() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let rig = default_rig();
    let handle = rig
        .orchestrator
        .start_job(request(SourceSpec::Url {
            url: format!("{}/video.mp4", server.uri()),
        }))
        .await
        .unwrap();
    let job = handle.wait().await.unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(
        rig.notifier.sent_texts().last().unwrap(),
        finalization::FAILURE_MESSAGE
    );
}

#[tokio::test]
async fn failing_status_edits_do_not_fail_the_job() {
    let rig = default_rig();
    rig.notifier
        .fail_edits
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let handle = rig
        .orchestrator
        .start_job(request(SourceSpec::Media {
            attachment: Some(video()),
        }))
        .await
        .unwrap();
    let job = handle.wait().await.unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert!(
        !rig.notifier
            .sent_texts()
            .iter()
            .any(|t| t == finalization::FAILURE_MESSAGE)
    );
}

#[tokio::test]
async fn failed_final_edit_still_delivers_the_link() {
    let rig = default_rig();
    rig.notifier
        .fail_edits
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let handle = rig
        .orchestrator
        .start_job(request(SourceSpec::Media {
            attachment: Some(video()),
        }))
        .await
        .unwrap();
    let job = handle.wait().await.unwrap();

    assert_eq!(job.state, JobState::Completed);
    let name = &job.outputs[0].name;
    let calls = rig.notifier.calls();
    assert_eq!(
        calls.last().unwrap(),
        &NotifierCall::Send {
            chat: CHAT,
            text: format!("Video is available at {TEST_HOST}/{name}"),
            reply_to: Some(TRIGGER),
            handle: MessageRef(1001),
        }
    );
}
