use crate::{init_logging, payload, requested_range, response, target, ScriptedServer};
use multiget::{plan, Concurrency, Error, Phase, Scheduler, SinkLayout};

/// Serves ranges of `data`, answering 500 for the range starting at `broken`
fn range_server(data: Vec<u8>, broken: Option<usize>) -> ScriptedServer {
    ScriptedServer::start(move |request| match requested_range(request) {
        Some((start, _)) if Some(start) == broken => {
            response("HTTP/1.1 500 Internal Server Error", b"")
        }
        Some((start, end)) => response("HTTP/1.1 206 Partial Content", &data[start..=end]),
        None => response("HTTP/1.1 200 OK", &data),
    })
}

fn contents(batch: &multiget::Batch) -> Vec<u8> {
    batch
        .states
        .iter()
        .flat_map(|s| std::fs::read(s.sink_path()).unwrap())
        .collect()
}

#[test]
fn every_chunk_reaches_a_terminal_state() {
    init_logging();
    let server = range_server(payload(10), Some(4));
    let dir = tempfile::tempdir().unwrap();
    let layout = SinkLayout::new(dir.path(), "out.bin");
    let scheduler = Scheduler::new(Concurrency::parallel(2)).unwrap();

    let batch = scheduler.run(&target(server.port), plan(10, 4, 2).unwrap(), &layout);

    assert_eq!(batch.states.len(), 3);
    assert!(batch.states.iter().all(|s| s.phase().is_terminal()));
    assert_eq!(
        batch.states.iter().map(|s| s.index()).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(batch.states[1].phase(), Phase::Failed);
    assert!(matches!(
        batch.states[1].error(),
        Some(Error::HttpStatus { code: 500 })
    ));
    assert_eq!(batch.outcome.succeeded, 2);
    assert_eq!(batch.outcome.failed, 1);
    assert_eq!(batch.outcome.total_bytes_written, 6);
}

#[test]
fn modes_produce_the_same_chunks() {
    init_logging();
    let data = payload(8 * 1024 + 100);
    let server = range_server(data.clone(), None);
    let specs = plan(data.len() as u64, 1024, 8).unwrap();
    assert_eq!(specs.len(), 9);

    for concurrency in [
        Concurrency::serial(),
        Concurrency::parallel(1),
        Concurrency::parallel(4),
    ] {
        let dir = tempfile::tempdir().unwrap();
        let layout = SinkLayout::new(dir.path(), "out.bin");
        let scheduler = Scheduler::new(concurrency).unwrap();
        let batch = scheduler.run(&target(server.port), specs.clone(), &layout);

        assert!(batch.outcome.all_succeeded(), "{:?}", concurrency);
        assert_eq!(contents(&batch), data, "{:?}", concurrency);
    }
}
