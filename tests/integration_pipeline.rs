#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::io::Write;

use tablechat::cleaning::clean;
use tablechat::documents::ChunkingConfig;
use tablechat::embeddings::Embedder;
use tablechat::indexer::{DEFAULT_TOP_K, Indexer};
use tablechat::prompt::assemble_prompt;
use tablechat::table::{Table, Value};
use tempfile::NamedTempFile;

/// Deterministic embedder: a letter-frequency vector over a-z. Crude, but
/// rows sharing words with the question score measurably higher.
struct LetterBagEmbedder;

impl Embedder for LetterBagEmbedder {
    fn model_id(&self) -> &str {
        "letter-bag"
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| letter_bag(t)).collect())
    }
}

fn letter_bag(text: &str) -> Vec<f32> {
    let mut counts = vec![0.0f32; 26];
    for c in text.chars().filter(char::is_ascii_alphabetic) {
        let idx = (c.to_ascii_lowercase() as u8 - b'a') as usize;
        counts[idx] += 1.0;
    }
    counts
}

fn write_sample_csv() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("temp file should be created");
    write!(
        file,
        "Store,Item,Price\n\
         Oslo,Cod,120\n\
         Oslo,Cod,120\n\
         Bergen,Salmon,\n\
         Bergen,Herring,80\n\
         Oslo,Salmon,140\n"
    )
    .expect("write should succeed");
    file
}

#[test]
fn csv_file_to_cleaned_table() {
    let file = write_sample_csv();

    let table = Table::from_file(file.path()).expect("parse should succeed");
    let cleaned = clean(&table);

    // One duplicate row dropped, missing price filled with the median.
    assert_eq!(table.row_count(), 5);
    assert_eq!(cleaned.row_count(), 4);
    let price = cleaned.column("price").expect("column exists");
    assert!(price.values().all(|v| *v != Value::Missing));
}

#[test]
fn cleaned_table_round_trips_through_csv() {
    let file = write_sample_csv();
    let table = Table::from_file(file.path()).expect("parse should succeed");
    let cleaned = clean(&table);

    let out = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("temp file should be created");
    cleaned.write_csv(out.path()).expect("write should succeed");

    let reloaded = Table::from_file(out.path()).expect("reparse should succeed");
    assert_eq!(reloaded.columns(), cleaned.columns());
    assert_eq!(reloaded.row_count(), cleaned.row_count());
}

#[test]
fn pipeline_answers_are_grounded_in_retrieved_rows() {
    let file = write_sample_csv();
    let table = Table::from_file(file.path()).expect("parse should succeed");
    let cleaned = clean(&table);

    let indexer = Indexer::new(LetterBagEmbedder, ChunkingConfig::default(), 2);
    let index = indexer.build(&cleaned).expect("indexing should succeed");
    assert!(index.chunk_count() > 0);

    let question = "What does Herring cost in Bergen?";
    let retrieved = index
        .query(&LetterBagEmbedder, question, DEFAULT_TOP_K)
        .expect("query should succeed");
    assert!(!retrieved.is_empty());

    let prompt = assemble_prompt(&cleaned, question, &retrieved);

    assert!(prompt.contains("expert data analyst"));
    assert!(prompt.contains(question));
    assert!(prompt.contains("Herring"));
}

#[test]
fn query_with_a_different_embedder_is_rejected() {
    struct OtherEmbedder;
    impl Embedder for OtherEmbedder {
        fn model_id(&self) -> &str {
            "other-model"
        }
        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| letter_bag(t)).collect())
        }
    }

    let table = Table::new(
        vec!["Store".to_string()],
        vec![vec![Value::Text("Oslo".to_string())]],
    )
    .expect("valid table");

    let index = Indexer::new(LetterBagEmbedder, ChunkingConfig::default(), 10)
        .build(&table)
        .expect("indexing should succeed");

    let result = index.query(&OtherEmbedder, "anything", DEFAULT_TOP_K);
    let err = result.expect_err("mismatched embedder should be rejected");
    assert!(err.to_string().contains("letter-bag"));
}

#[test]
fn chunking_covers_every_row_of_a_wide_table() {
    let columns = vec!["Store".to_string(), "Notes".to_string()];
    let rows: Vec<Vec<Value>> = (0..120)
        .map(|i| {
            vec![
                Value::Text(format!("Store{}", i)),
                Value::Text("x".repeat(60)),
            ]
        })
        .collect();
    let table = Table::new(columns, rows).expect("valid table");

    let index = Indexer::new(LetterBagEmbedder, ChunkingConfig::default(), 16)
        .build(&table)
        .expect("indexing should succeed");

    let retrieved = index
        .query(&LetterBagEmbedder, "Store119", usize::MAX)
        .expect("query should succeed");
    assert!(
        retrieved
            .iter()
            .any(|scored| scored.chunk.content.contains("Store119")),
        "the last row must be reachable through some chunk"
    );
}
