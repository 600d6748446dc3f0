//! Requests that are rejected locally, and fetches that go wrong.
use std::sync::Arc;

use ncdap_clap_blocks::cache::CacheConfig;
use ncdap_dds::{Dds, DdsBuilder};
use ncdap_getvara::{Error, ErrorKind, Session, SubsetRequest};
use ncdap_test_helpers::{MOCK_URL, MockFetcher, fixtures};
use ncdap_types::NcType;
use pretty_assertions::assert_eq;
use url::Url;

fn open(fetcher: &Arc<MockFetcher>, fragment: &str) -> Session {
    Session::builder(
        Url::parse(&format!("{MOCK_URL}#{fragment}")).unwrap(),
        fixtures::dataset(),
        Arc::clone(fetcher) as _,
    )
    .build()
    .unwrap()
}

fn kind_of(session: &mut Session, req: &SubsetRequest) -> ErrorKind {
    session
        .get_values(req, NcType::Double)
        .unwrap_err()
        .kind()
}

#[test_log::test]
fn type_mismatch_is_caught_before_any_fetch() {
    let fetcher = Arc::new(MockFetcher::new());
    let mut session = open(&fetcher, "");

    let err = session
        .get_values(&SubsetRequest::new("name"), NcType::Int)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    let err = session
        .get_values(&SubsetRequest::new("v"), NcType::Char)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(fetcher.call_count(), 0);
}

#[test]
fn invalid_coordinates() {
    let fetcher = Arc::new(MockFetcher::new());
    let mut session = open(&fetcher, "prefetch=0");

    let past_the_end = SubsetRequest::new("v").start([8]).count([3]);
    assert_eq!(kind_of(&mut session, &past_the_end), ErrorKind::InvalidCoordinates);

    let too_many = SubsetRequest::new("v").start([0, 0]);
    let err = session.get_values(&too_many, NcType::Int).unwrap_err();
    assert!(
        matches!(
            err,
            Error::InvalidCoordinates {
                source: ncdap_constraint::Error::RankMismatch {
                    expected: 1,
                    actual: 2,
                    ..
                }
            }
        ),
        "{err}"
    );

    let zero_stride = SubsetRequest::new("t").stride([1, 0]).count([2, 3]);
    assert_eq!(kind_of(&mut session, &zero_stride), ErrorKind::InvalidCoordinates);
    assert_eq!(fetcher.call_count(), 0);
}

#[test]
fn rank_is_bounded_by_config() {
    let fetcher = Arc::new(MockFetcher::new());
    let mut session = Session::builder(
        Url::parse(MOCK_URL).unwrap(),
        fixtures::dataset(),
        Arc::clone(&fetcher) as _,
    )
    .config(CacheConfig {
        max_rank: 1,
        prefetch: false,
        ..Default::default()
    })
    .build()
    .unwrap();

    let err = session
        .get_values(&SubsetRequest::new("t"), NcType::Double)
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::InvalidCoordinates {
                source: ncdap_constraint::Error::TooManyDimensions { rank: 2, max: 1 }
            }
        ),
        "{err}"
    );
    assert_eq!(fetcher.call_count(), 0);
}

/// Two structures holding identically named members.
fn twins() -> Dds {
    let mut b = DdsBuilder::new("twins");
    let root = b.root();
    for outer in ["a", "b"] {
        let parent = b.structure(root, outer, &[]).unwrap();
        let g = b.structure(parent, "g", &[]).unwrap();
        b.primitive(g, "x", NcType::Float, &[4]).unwrap();
    }
    b.build()
}

#[test]
fn names_must_resolve_uniquely() {
    let fetcher = Arc::new(MockFetcher::new());
    let mut session = Session::builder(
        Url::parse(&format!("{MOCK_URL}#prefetch=0")).unwrap(),
        twins(),
        Arc::clone(&fetcher) as _,
    )
    .build()
    .unwrap();

    assert_eq!(
        kind_of(&mut session, &SubsetRequest::new("g.x")),
        ErrorKind::Ambiguous
    );
    assert_eq!(
        kind_of(&mut session, &SubsetRequest::new("w")),
        ErrorKind::NotFound
    );
    assert_eq!(session.shape(&["a", "g", "x"]).unwrap(), vec![4]);
    assert_eq!(fetcher.call_count(), 0);
}

#[test]
fn server_status_is_reported_by_kind() {
    for (status, expected) in [
        (401, ErrorKind::AuthRequired),
        (403, ErrorKind::AuthRequired),
        (404, ErrorKind::NotFound),
        (418, ErrorKind::AccessDenied),
        (500, ErrorKind::ServiceError),
        (503, ErrorKind::ServiceError),
    ] {
        let fetcher = Arc::new(MockFetcher::new().fail(Some("v"), status));
        let mut session = open(&fetcher, "prefetch=0");
        let err = session.get_vars::<i32>(&SubsetRequest::new("v")).unwrap_err();
        assert_eq!(err.kind(), expected, "status {status}: {err}");
        assert!(session.cache().is_empty());
    }
}

#[test]
fn short_sequences_are_out_of_range() {
    let fetcher = Arc::new(MockFetcher::new().respond(
        Some("obs.depth"),
        fixtures::in_dataset(vec![fixtures::obs_records(2)]),
    ));
    let mut session = open(&fetcher, "prefetch=0");

    let req = SubsetRequest::new("obs.depth").start([1]).count([3]);
    let err = session.get_vars::<f64>(&req).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    assert!(
        matches!(
            &err,
            Error::OutOfRange {
                name,
                index: 2,
                available: 2
            } if name == "obs"
        ),
        "{err}"
    );
}

#[test]
fn mapped_reads_check_the_buffer() {
    let fetcher = Arc::new(
        MockFetcher::new().respond(Some("t"), fixtures::in_dataset(vec![fixtures::t()])),
    );
    let mut session = open(&fetcher, "prefetch=0");

    let mut out = [0f64; 5];
    let err = session
        .get_varm_into(&SubsetRequest::new("t"), &[1, 2], &mut out)
        .unwrap_err();
    assert!(matches!(err, Error::OutputTooSmall { needed: 6, len: 5 }), "{err}");
    assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);

    let err = session
        .get_varm_into(&SubsetRequest::new("t"), &[1], &mut out)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);
}

#[test]
fn huge_index_maps_are_rejected() {
    let fetcher = Arc::new(
        MockFetcher::new().respond(Some("v[0:1]"), fixtures::in_dataset(vec![fixtures::v(0..2)])),
    );
    let mut session = open(&fetcher, "prefetch=0");

    let req = SubsetRequest::new("v").start([0]).count([2]);
    let err = session
        .get_varm_into(&req, &[usize::MAX], &mut [0i32; 4])
        .unwrap_err();
    assert!(matches!(err, Error::IndexMapOverflow { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);

    let mut out = [0i32; 4];
    session.get_varm_into(&req, &[3], &mut out).unwrap();
    assert_eq!(out, [0, 0, 0, 1]);
}

/// A sequence whose record count the metadata does not give.
fn open_ended() -> Dds {
    let mut b = DdsBuilder::new(fixtures::DATASET);
    let root = b.root();
    let obs = b.sequence(root, "obs", None).unwrap();
    b.primitive(obs, "depth", NcType::Double, &[]).unwrap();
    b.primitive(obs, "id", NcType::Int, &[]).unwrap();
    b.build()
}

#[test]
fn unknown_length_sequences_are_read_until_the_records_run_out() {
    let fetcher = Arc::new(MockFetcher::new().respond(
        Some("obs.id"),
        fixtures::in_dataset(vec![fixtures::obs_records(2)]),
    ));
    let mut session = Session::builder(
        Url::parse(&format!("{MOCK_URL}#prefetch=0")).unwrap(),
        open_ended(),
        Arc::clone(&fetcher) as _,
    )
    .build()
    .unwrap();

    // the last index does not fit in a usize
    let req = SubsetRequest::new("obs.id")
        .start([0])
        .count([usize::MAX])
        .stride([2]);
    let err = session.get_values(&req, NcType::Int).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);
    assert_eq!(fetcher.call_count(), 0);

    let req = SubsetRequest::new("obs.id").start([0]).count([usize::MAX]);
    let err = session.get_values(&req, NcType::Int).unwrap_err();
    assert!(
        matches!(&err, Error::OutOfRange { index: 2, available: 2, .. }),
        "{err}"
    );

    let req = SubsetRequest::new("obs.id").start([1]).count([1]);
    assert_eq!(session.get_vars::<i32>(&req).unwrap(), vec![101]);
}

#[test]
fn payloads_missing_the_variable_are_rejected() {
    let fetcher = Arc::new(
        MockFetcher::new().respond(Some("v"), fixtures::in_dataset(vec![fixtures::t()])),
    );
    let mut session = open(&fetcher, "prefetch=0");

    let err = session.get_vars::<i32>(&SubsetRequest::new("v")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayload);
}
