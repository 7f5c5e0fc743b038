//! Extraction throughput on a full listing page
//!
//! A listing page carries 10 reviews; the structural fallback walks every div,
//! so it is measured separately.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use shopify_review_tracker::infrastructure::parsing::{ParseContext, ReviewListParser, normalize_review_date};

fn listing_page(reviews: usize) -> String {
    let body: String = (0..reviews)
        .map(|i| {
            let stars = "<svg class=\"tw-fill-fg-primary\"></svg>".repeat(1 + i % 5);
            format!(
                r#"<div data-merchant-review="">
                     <div class="tw-flex">{stars}</div>
                     <div class="tw-text-body-xs tw-text-fg-tertiary">August {}, 2025</div>
                     <div data-truncate-content-copy=""><p>Review body number {i} with some words</p></div>
                     <span class="tw-text-heading-xs">Store {i}</span>
                     <div class="review-metadata">Store {i} from Canada</div>
                   </div>"#,
                1 + i % 28
            )
        })
        .collect();
    format!("<html><body><main>{body}</main></body></html>")
}

fn structural_page(reviews: usize) -> String {
    let body: String = (0..reviews)
        .map(|i| {
            format!(
                r#"<div class="card"><span data-star="filled"></span><h4>Shop {i}</h4>
                   <div class="review-body">ok</div><time>April 2, 2025</time></div>"#
            )
        })
        .collect();
    format!("<html><body><div id=\"list\">{body}</div></body></html>")
}

fn extraction(c: &mut Criterion) {
    let parser = ReviewListParser::new().expect("default selectors compile");
    let context = ParseContext::new("Bench App", 1);

    let mut group = c.benchmark_group("extract_page");
    for reviews in [10, 50] {
        let page = listing_page(reviews);
        group.bench_with_input(BenchmarkId::new("primary_selectors", reviews), &page, |b, page| {
            b.iter(|| parser.parse_page(black_box(page), &context))
        });

        let page = structural_page(reviews);
        group.bench_with_input(BenchmarkId::new("structural_fallback", reviews), &page, |b, page| {
            b.iter(|| parser.parse_page(black_box(page), &context))
        });
    }
    group.finish();

    c.bench_function("normalize_review_date", |b| {
        b.iter(|| normalize_review_date(black_box("  December\n 31,  2023 ")))
    });
}

criterion_group!(benches, extraction);
criterion_main!(benches);
