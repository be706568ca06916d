use std::sync::Arc;

use chatlink_domain::{
    ContributedLinkifier, Error, LinkifyConfig, LinkifyContext, LocationAnchor, Part, Range,
    coalesce_parts, plain_text,
};
use chatlink_test_kit::{FailingLinkifier, StubLinkifier};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::ResponseLinkifier;
use crate::state::split_runs;

fn uri(path: &str) -> Url {
    Url::parse(&format!("file:///workspace/{path}")).unwrap()
}

fn bare(path: &str) -> Part {
    Part::from(LocationAnchor::new(uri(path)))
}

fn at_line(path: &str, line: u32) -> Part {
    Part::from(LocationAnchor::new(uri(path)).range(Range::at_line(line)))
}

fn stub(paths: &[&str]) -> StubLinkifier {
    paths
        .iter()
        .fold(StubLinkifier::default(), |stub, path| stub.resolve(*path, uri(path)))
}

fn engine(linkifiers: Vec<Arc<dyn ContributedLinkifier>>) -> ResponseLinkifier {
    ResponseLinkifier::new(linkifiers, LinkifyContext::default(), "chatlink")
}

/// Feeds every chunk, flushes and returns the coalesced output.
async fn run(engine: &mut ResponseLinkifier, chunks: &[&str]) -> Vec<Part> {
    let cancel = CancellationToken::new();
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(engine.append(chunk, &cancel).await.unwrap());
    }
    out.extend(engine.flush(&cancel).await.unwrap().unwrap_or_default());
    coalesce_parts(out)
}

fn chunks_of(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|chunk| chunk.iter().collect()).collect()
}

#[tokio::test]
async fn test_parenthesized_line_upgrades_anchor() {
    let mut fixture = engine(vec![Arc::new(stub(&["inspectdb.py"]))]);

    let actual = run(&mut fixture, &["inspectdb.py (line 340) - The primary usage."]).await;

    let expected = vec![
        at_line("inspectdb.py", 339),
        Part::text(" (line 340) - The primary usage."),
    ];
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_range_split_across_chunks_upgrades_anchor() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);
    let cancel = CancellationToken::new();

    let first = fixture.append("foo.py is at lines 76-", &cancel).await.unwrap();
    assert_eq!(first, vec![at_line("foo.py", 75), Part::text(" is at lines 76-")]);

    let second = fixture.append("83.", &cancel).await.unwrap();
    assert_eq!(second, vec![Part::text("83.")]);

    let rest = fixture.flush(&cancel).await.unwrap();
    assert_eq!(rest, None);
}

#[tokio::test]
async fn test_preceding_range_upgrades_anchor() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);

    let actual = run(&mut fixture, &["The check in lines 5-7 of foo.py fails.\n"]).await;

    let expected = vec![
        Part::text("The check in lines 5-7 of "),
        at_line("foo.py", 4),
        Part::text(" fails.\n"),
    ];
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_anchor_without_annotation_is_released_at_sentence_end() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);
    let cancel = CancellationToken::new();

    let actual = fixture.append("Edit foo.py first", &cancel).await.unwrap();
    assert_eq!(actual, vec![Part::text("Edit ")]);

    let actual = fixture.append(". Then run it", &cancel).await.unwrap();
    let expected = vec![bare("foo.py"), Part::text(" first. Then run it")];
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_fenced_code_is_never_linkified() {
    let linkifier = stub(&["foo.py"]);
    let mut fixture = engine(vec![Arc::new(linkifier.clone())]);

    let actual = run(&mut fixture, &["```\nfoo.py (line 3)\n```\n", "foo.py here\n"]).await;

    let expected = vec![
        Part::text("```\nfoo.py (line 3)\n```\n"),
        bare("foo.py"),
        Part::text(" here\n"),
    ];
    assert_eq!(actual, expected);
    assert!(!linkifier.seen().iter().any(|text| text.contains("(line")));
}

#[tokio::test]
async fn test_fence_split_across_chunks_stays_opaque() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);

    let actual = run(&mut fixture, &["  ~~", "~\n  foo.py\n", "  ~~~\ndone"]).await;

    assert_eq!(actual, vec![Part::text("  ~~~\n  foo.py\n  ~~~\ndone")]);
}

#[tokio::test]
async fn test_backtick_fence_split_after_two_ticks_stays_opaque() {
    let linkifier = stub(&["foo.py"]);
    let mut fixture = engine(vec![Arc::new(linkifier.clone())]);

    let actual = run(&mut fixture, &["``", "`python\nfoo.py (line 3)\n```\n"]).await;

    assert_eq!(actual, vec![Part::text("```python\nfoo.py (line 3)\n```\n")]);
    assert!(!linkifier.seen().iter().any(|text| text.contains("foo.py")));
}

#[tokio::test]
async fn test_backtick_fence_split_after_one_tick_stays_opaque() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);

    let actual = run(&mut fixture, &["`", "``\nfoo.py\n```\nfoo.py\n"]).await;

    let expected = vec![
        Part::text("```\nfoo.py\n```\n"),
        bare("foo.py"),
        Part::text("\n"),
    ];
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_stray_backticks_do_not_swallow_later_fence() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);

    let actual = run(&mut fixture, &["odd`` span.\n\n~~~\nfoo.py\n~~~\n"]).await;

    assert_eq!(actual, vec![Part::text("odd`` span.\n\n~~~\nfoo.py\n~~~\n")]);
}

#[tokio::test]
async fn test_math_is_emitted_verbatim() {
    let linkifier = stub(&["foo.py"]);
    let mut fixture = engine(vec![Arc::new(linkifier.clone())]);

    let actual = run(&mut fixture, &["$x + y$ and\n$$\nfoo.py\n$$\n"]).await;

    assert_eq!(actual, vec![Part::text("$x + y$ and\n$$\nfoo.py\n$$\n")]);
    assert!(!linkifier.seen().iter().any(|text| text.contains('$')));
}

#[tokio::test]
async fn test_text_after_inline_math_is_reprocessed() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);

    let actual = run(&mut fixture, &["$a$foo.py\n"]).await;

    assert_eq!(actual, vec![Part::text("$a$"), bare("foo.py"), Part::text("\n")]);
}

#[tokio::test]
async fn test_failing_linkifier_does_not_stop_others() {
    let mut fixture = engine(vec![Arc::new(FailingLinkifier), Arc::new(stub(&["foo.py"]))]);

    let actual = run(&mut fixture, &["see foo.py\n"]).await;

    assert_eq!(actual, vec![Part::text("see "), bare("foo.py"), Part::text("\n")]);
}

#[tokio::test]
async fn test_unlinkable_markdown_link_is_delinkified() {
    let mut fixture = engine(vec![]);

    let actual = run(
        &mut fixture,
        &["See [notes](docs/notes.md) and [site](https://a.dev) now"],
    )
    .await;

    assert_eq!(actual, vec![Part::text("See notes and [site](https://a.dev) now")]);
}

#[tokio::test]
async fn test_link_inside_inline_code_is_kept() {
    let mut fixture = engine(vec![]);

    let actual = run(&mut fixture, &["Write `[a](b.md)` literally"]).await;

    assert_eq!(actual, vec![Part::text("Write `[a](b.md)` literally")]);
}

#[tokio::test]
async fn test_round_trip_preserves_text_for_any_chunk_size() {
    let fixture = chatlink_test_kit::fixture!("/src/fixtures/response.md").await;

    for size in [1, 2, 3, 7, 16, 64, fixture.len()] {
        let chunks = chunks_of(&fixture, size);
        let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let mut engine = engine(vec![]);

        let actual = run(&mut engine, &chunks).await;

        assert_eq!(plain_text(&actual), fixture, "chunk size {size}");
    }
}

#[tokio::test]
async fn test_fenced_mentions_stay_literal_for_any_chunk_size() {
    let fixture = chatlink_test_kit::fixture!("/src/fixtures/response.md").await;

    for size in [1, 2, 3, 4, 5, 7, 16, 64, fixture.len()] {
        let chunks = chunks_of(&fixture, size);
        let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let mut engine = engine(vec![Arc::new(stub(&["foo.py"]))]);

        let actual = run(&mut engine, &chunks).await;

        assert_eq!(plain_text(&actual), fixture, "chunk size {size}");
        let anchors = actual.iter().filter(|part| part.as_anchor().is_some()).count();
        assert_eq!(anchors, 0, "chunk size {size}");
    }
}

#[tokio::test]
async fn test_whitespace_chunk_boundaries_do_not_change_output() {
    let text = "Open foo.py (line 12) and then bar.rs again.\n\
                Also `foo.py` and lines 3-4 of bar.rs work.\n\
                ```\nfoo.py\n```\nfoo.py is long enough to wait";
    let paths = ["foo.py", "bar.rs"];

    let single = run(&mut engine(vec![Arc::new(stub(&paths))]), &[text]).await;

    let runs: Vec<&str> = split_runs(text).collect();
    let split = run(&mut engine(vec![Arc::new(stub(&paths))]), &runs).await;

    assert_eq!(split, single);
    assert!(single.contains(&at_line("foo.py", 11)));
    assert!(single.contains(&at_line("bar.rs", 2)));
}

#[tokio::test]
async fn test_custom_flush_threshold_releases_early() {
    let config = LinkifyConfig::default().trailing_flush_chars(5usize);
    let mut fixture = ResponseLinkifier::with_config(
        vec![Arc::new(stub(&["foo.py"]))],
        LinkifyContext::default(),
        config,
    );
    let cancel = CancellationToken::new();

    let actual = fixture.append("foo.py is somewhere ", &cancel).await.unwrap();

    assert_eq!(actual, vec![bare("foo.py"), Part::text(" is somewhere ")]);
}

#[tokio::test]
async fn test_flush_releases_held_inline_code() {
    let mut fixture = engine(vec![]);
    let cancel = CancellationToken::new();

    let actual = fixture.append("see `unterminated", &cancel).await.unwrap();
    assert_eq!(actual, vec![Part::text("see ")]);

    let actual = fixture.flush(&cancel).await.unwrap();
    assert_eq!(actual, Some(vec![Part::text("`unterminated")]));
}

#[tokio::test]
async fn test_flush_of_empty_response_is_none() {
    let mut fixture = engine(vec![]);
    let actual = fixture.flush(&CancellationToken::new()).await.unwrap();
    assert_eq!(actual, None);
}

#[tokio::test]
async fn test_cancelled_append_returns_cancelled() {
    let mut fixture = engine(vec![Arc::new(stub(&["foo.py"]))]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let actual = fixture.append("foo.py ", &cancel).await;

    assert_eq!(actual, Err(Error::Cancelled));
}

#[tokio::test]
async fn test_cancellation_requested_by_linkifier_stops_append() {
    let cancel = CancellationToken::new();
    let cancelling = StubLinkifier::default().cancel_on_call(cancel.clone());
    let mut fixture = engine(vec![Arc::new(cancelling)]);

    let actual = fixture.append("one two three", &cancel).await;

    assert_eq!(actual, Err(Error::Cancelled));
}

#[cfg(debug_assertions)]
#[tokio::test]
#[should_panic(expected = "used after flush")]
async fn test_append_after_flush_panics_in_debug_builds() {
    let mut fixture = engine(vec![]);
    let cancel = CancellationToken::new();
    fixture.flush(&cancel).await.unwrap();

    let _ = fixture.append("late", &cancel).await;
}

#[cfg(not(debug_assertions))]
#[tokio::test]
async fn test_append_after_flush_is_rejected() {
    let mut fixture = engine(vec![]);
    let cancel = CancellationToken::new();
    fixture.flush(&cancel).await.unwrap();

    let actual = fixture.append("late", &cancel).await;

    assert_eq!(actual, Err(Error::AlreadyFlushed));
}
