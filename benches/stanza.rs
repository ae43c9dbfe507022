use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ontie::{OntieId, OrganismRecord, ProteinRecord, Record, Stanza};

fn organisms(n: u32) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::from(OrganismRecord {
                organism_id: 10_000_000 + i,
                label: format!(" Mus musculus\tstrain {i} "),
                rank: Some("subspecies".to_string()),
                parent_tax_id: 10090,
                parents: "10090".to_string(),
                parent: "Mus musculus".to_string(),
            })
        })
        .collect()
}

fn proteins(n: u32) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::from(ProteinRecord {
                source_id: i,
                name: format!("Envelope glycoprotein {i}"),
                aliases: Some("gp160, Env".to_string()),
                synonyms: Some("gp120, gp41".to_string()),
                organism_id: 11676,
                organism: "Human immunodeficiency virus 1".to_string(),
            })
        })
        .collect()
}

fn stanza_benchmark(c: &mut Criterion) {
    let synonyms = vec!["BALB/c".to_string(), "BALB/c mouse".to_string()];
    let superclasses = vec!["Mus".to_string()];

    let records = organisms(1000);
    c.bench_function("format organism stanzas", |b| {
        b.iter(|| {
            records
                .iter()
                .enumerate()
                .map(|(idx, record)| {
                    Stanza::new(OntieId::from(idx as u32), black_box(record))
                        .with_synonyms(&synonyms)
                        .with_superclasses(&superclasses)
                        .to_string()
                        .len()
                })
                .sum::<usize>()
        })
    });

    let records = proteins(1000);
    c.bench_function("format protein stanzas", |b| {
        b.iter(|| {
            records
                .iter()
                .enumerate()
                .map(|(idx, record)| {
                    Stanza::new(OntieId::from(idx as u32), black_box(record))
                        .to_string()
                        .len()
                })
                .sum::<usize>()
        })
    });
}

criterion_group! {
    name = stanza;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(5));
    targets = stanza_benchmark
}
criterion_main!(stanza);
