use super::*;

fn chunk(index: usize, content: &str) -> Chunk {
    Chunk {
        content: content.to_string(),
        row_start: index,
        row_end: index,
        chunk_index: index,
    }
}

fn filled_index() -> InMemoryIndex {
    let mut index = InMemoryIndex::new();
    index
        .add(chunk(0, "east"), vec![1.0, 0.0])
        .expect("add should succeed");
    index
        .add(chunk(1, "north"), vec![0.0, 1.0])
        .expect("add should succeed");
    index
        .add(chunk(2, "northeast"), vec![1.0, 1.0])
        .expect("add should succeed");
    index
}

#[test]
fn search_ranks_by_cosine_similarity() {
    let index = filled_index();

    let results = index.search(&[1.0, 0.0], 3).expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk.content, "east");
    assert_eq!(results[1].chunk.content, "northeast");
    assert_eq!(results[2].chunk.content, "north");
    assert!(results[0].score > results[1].score);
    assert!(results[1].score > results[2].score);
}

#[test]
fn search_with_large_k_returns_every_chunk_once() {
    let index = filled_index();

    let results = index.search(&[1.0, 1.0], 50).expect("search should succeed");

    assert_eq!(results.len(), 3);
    let mut indices: Vec<usize> = results.iter().map(|r| r.chunk.chunk_index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2]);

    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn equal_scores_tie_break_by_insertion_order() {
    let mut index = InMemoryIndex::new();
    // Parallel vectors score identically against any query.
    index
        .add(chunk(0, "first"), vec![2.0, 0.0])
        .expect("add should succeed");
    index
        .add(chunk(1, "second"), vec![4.0, 0.0])
        .expect("add should succeed");

    let results = index.search(&[1.0, 0.0], 2).expect("search should succeed");

    assert_eq!(results[0].chunk.content, "first");
    assert_eq!(results[1].chunk.content, "second");
}

#[test]
fn search_truncates_to_k() {
    let index = filled_index();

    let results = index.search(&[1.0, 0.0], 1).expect("search should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.content, "east");
}

#[test]
fn add_rejects_dimension_change() {
    let mut index = InMemoryIndex::new();
    index
        .add(chunk(0, "a"), vec![1.0, 0.0])
        .expect("add should succeed");

    let result = index.add(chunk(1, "b"), vec![1.0, 0.0, 0.0]);

    assert!(matches!(result, Err(AssistantError::IndexBuild(_))));
}

#[test]
fn add_rejects_empty_vector() {
    let mut index = InMemoryIndex::new();
    assert!(matches!(
        index.add(chunk(0, "a"), vec![]),
        Err(AssistantError::IndexBuild(_))
    ));
}

#[test]
fn search_rejects_mismatched_query_dimension() {
    let index = filled_index();

    let result = index.search(&[1.0, 0.0, 0.0], 3);

    assert!(matches!(result, Err(AssistantError::RetrievalMismatch(_))));
}

#[test]
fn empty_index_returns_no_results() {
    let index = InMemoryIndex::new();
    let results = index.search(&[1.0], 10).expect("search should succeed");
    assert!(results.is_empty());
    assert!(index.is_empty());
}

#[test]
fn cosine_similarity_basics() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    // Magnitude does not matter.
    assert!((cosine_similarity(&[2.0, 0.0], &[9.0, 0.0]) - 1.0).abs() < 1e-6);
    // Zero vectors score zero.
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
}
