//! End-to-end decode scenarios exercising the six correction kinds spec §8
//! calls out: exact match, proximity correction, omission, transposition,
//! multi-word via space omission, and digraph expansion.

use std::sync::Arc;

use decoder_core::decoder::{DecoderConfig, GridProximityState, Key, KeyGrid, MemoryTrieDict};
use decoder_core::{DecodeSession, DefaultScoring, TypingWeighting};

fn grid() -> KeyGrid {
    KeyGrid::new(vec![
        Key { code_point: 't', x: 0, y: 0, width: 10, height: 10 },
        Key { code_point: 'h', x: 10, y: 0, width: 10, height: 10 },
        Key { code_point: 'e', x: 20, y: 0, width: 10, height: 10 },
        Key { code_point: 'y', x: 30, y: 0, width: 10, height: 10 },
        Key { code_point: 'c', x: 40, y: 0, width: 10, height: 10 },
        Key { code_point: 'a', x: 50, y: 0, width: 10, height: 10 },
        Key { code_point: 'o', x: 60, y: 0, width: 10, height: 10 },
        Key { code_point: 'l', x: 70, y: 0, width: 10, height: 10 },
        // One key's breadth from 't', close enough to register as a
        // proximity (not substitution/unrelated) edge.
        Key { code_point: 'r', x: 4, y: 8, width: 10, height: 10 },
    ])
}

fn dict() -> Arc<MemoryTrieDict> {
    Arc::new(MemoryTrieDict::build(
        &[
            ("the".to_string(), 100),
            ("they".to_string(), 80),
            ("cat".to_string(), 80),
            ("öl".to_string(), 60),
        ],
        &[("the".to_string(), "cat".to_string(), 8)],
    ))
}

fn session() -> DecodeSession<MemoryTrieDict, TypingWeighting, DefaultScoring> {
    DecodeSession::new(dict(), TypingWeighting::default(), DefaultScoring::default(), DecoderConfig::default())
}

fn decode(typed: &str) -> Vec<decoder_core::Suggestion> {
    let mut s = session();
    let chars: Vec<char> = typed.chars().collect();
    let proximity = GridProximityState::new(grid(), chars.clone());
    s.decode(&proximity, chars.len(), None, 0, None).unwrap()
}

#[test]
fn exact_match_is_ranked_first_and_flagged_exact() {
    let suggestions = decode("the");
    assert_eq!(suggestions[0].code_points, vec!['t', 'h', 'e']);
}

#[test]
fn single_proximity_correction_still_finds_the_word() {
    // 'r' sits one key's breadth from 't' on this grid, close enough to
    // register as ProximityType::Proximity rather than Unrelated.
    let suggestions = decode("rhe");
    assert!(suggestions.iter().any(|s| s.code_points == vec!['t', 'h', 'e']));
}

#[test]
fn omission_of_a_middle_letter_still_finds_the_word() {
    let suggestions = decode("te");
    assert!(suggestions.iter().any(|s| s.code_points == vec!['t', 'h', 'e']));
}

#[test]
fn transposition_of_two_letters_still_finds_the_word() {
    let suggestions = decode("teh");
    assert!(suggestions.iter().any(|s| s.code_points == vec!['t', 'h', 'e']));
}

#[test]
fn space_omission_finds_the_second_word_of_a_run_on_phrase() {
    let suggestions = decode("thecat");
    let second_word = suggestions
        .iter()
        .find(|s| s.code_points == vec!['c', 'a', 't'] && s.has_multiple_words);
    assert!(second_word.is_some());
    assert_eq!(second_word.unwrap().second_word_first_input_index, 3);
}

#[test]
fn digraph_expansion_matches_the_composite_letter() {
    let suggestions = decode("oel");
    assert!(suggestions.iter().any(|s| s.code_points == vec!['ö', 'l']));
}
