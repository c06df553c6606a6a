use criterion::{criterion_group, criterion_main, Criterion};
use termrank_core::{rank, Document, Index, IndexConfig};

fn corpus() -> Vec<Document> {
    let words = ["patient", "medication", "headache", "nausea", "dizziness", "reported", "the", "and", "caused", "dose"];
    (0..500u32)
        .map(|i| {
            let text: Vec<&str> = (0..40).map(|j| words[((i * 7 + j * 13) % words.len() as u32) as usize]).collect();
            Document::new(i, text.join(" "))
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let docs = corpus();
    c.bench_function("fit_500_docs", |b| b.iter(|| Index::fit(&docs, IndexConfig::default())));
}

fn bench_rank(c: &mut Criterion) {
    let docs = corpus();
    let index = Index::fit(&docs, IndexConfig::default()).expect("fit");
    c.bench_function("rank_500_docs", |b| b.iter(|| rank("nausea and dizziness", &index, &docs)));
}

criterion_group!(benches, bench_fit, bench_rank);
criterion_main!(benches);
