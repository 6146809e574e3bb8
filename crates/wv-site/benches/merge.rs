//! Benchmarks for partial-site merging and finalization.

use std::path::PathBuf;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use wv_site::{
    EntryKind, FinalSite, MemorySink, NavCandidate, OutputEntry, PartialSite, SearchPosting,
};

/// Build a partial site with `count` synthetic pages.
fn make_partial(batch_index: usize, start: usize, count: usize) -> PartialSite {
    let mut partial = PartialSite::new(batch_index);
    partial.document_count = count;

    for i in start..start + count {
        let folder = i % 20;
        let output_path = format!("section-{folder}/page-{i}.html");
        let title = format!("Page {i}");
        let body = format!("<h1>Page {i}</h1><p>Body text for page {i}.</p>");

        partial.entries.push(OutputEntry {
            output_path: output_path.clone(),
            kind: EntryKind::Page,
            source_path: PathBuf::from(format!("Vault/section-{folder}/page-{i}.md")),
            title: title.clone(),
            show_in_nav: true,
            source_size: body.len() as u64,
            created: 1_700_000_000.0,
            modified: 1_700_000_100.0,
            bytes: body.into_bytes(),
        });
        partial.nav_candidates.push(NavCandidate {
            path: output_path.clone(),
            title: title.clone(),
        });
        if let Some(search) = partial.search.as_mut() {
            search.postings.push(SearchPosting {
                output_path: output_path.clone(),
                title,
                aliases: Vec::new(),
                headings: vec![format!("Page {i}"), "Details".to_owned()],
                tags: vec!["bench".to_owned()],
                path: output_path,
                content: format!("body text for page {i}"),
            });
        }
    }

    partial
}

fn bench_merge_partial(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_partial");

    for count in [100, 500, 2000] {
        group.bench_with_input(BenchmarkId::new("pages", count), &count, |b, &count| {
            b.iter_with_setup(
                || (FinalSite::new(""), MemorySink::new(), make_partial(0, 0, count)),
                |(mut site, sink, partial)| site.merge_partial(partial, &sink),
            )
        });
    }

    group.finish();
}

fn bench_merge_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_duplicates");

    // Second merge of the same batch: every entry is a duplicate skip.
    group.bench_function("all_duplicate_500", |b| {
        b.iter_with_setup(
            || {
                let mut site = FinalSite::new("");
                let sink = MemorySink::new();
                let partial = make_partial(0, 0, 500);
                site.merge_partial(partial.clone(), &sink).unwrap();
                (site, sink, partial)
            },
            |(mut site, sink, partial)| site.merge_partial(partial, &sink),
        )
    });

    group.finish();
}

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");

    // Finalization cost is dominated by the navigation rebuild over the
    // complete candidate set.
    for count in [100, 1000, 5000] {
        group.bench_with_input(BenchmarkId::new("pages", count), &count, |b, &count| {
            b.iter_with_setup(
                || {
                    let mut site = FinalSite::new("");
                    let sink = MemorySink::new();
                    let batch_size = count / 4;
                    for batch in 0..4 {
                        let partial = make_partial(batch, batch * batch_size, batch_size);
                        site.merge_partial(partial, &sink).unwrap();
                    }
                    site
                },
                |mut site| {
                    site.finalize();
                    site
                },
            )
        });
    }

    group.finish();
}

fn bench_search_contribution(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_merge");

    group.bench_function("postings_1000", |b| {
        b.iter_with_setup(
            || {
                let mut partial = make_partial(0, 0, 1000);
                partial.entries.clear();
                partial.nav_candidates.clear();
                (FinalSite::new(""), MemorySink::new(), partial)
            },
            |(mut site, sink, partial)| site.merge_partial(partial, &sink),
        )
    });

    group.finish();
}

fn bench_manifest_serialization(c: &mut Criterion) {
    let mut site = FinalSite::new("Vault");
    let sink = MemorySink::new();
    site.merge_partial(make_partial(0, 0, 1000), &sink).unwrap();
    site.finalize();

    let mut group = c.benchmark_group("manifest");

    group.bench_function("to_json_1000", |b| {
        b.iter(|| site.manifest(1_700_000_000.0).to_json())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_merge_partial,
    bench_merge_duplicates,
    bench_finalize,
    bench_search_contribution,
    bench_manifest_serialization,
);

criterion_main!(benches);
