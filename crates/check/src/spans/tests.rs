use proptest::prelude::*;

use super::*;

fn adj(footnotes: &[usize], deletions: &[usize]) -> Adjustments {
	Adjustments::new(footnotes.to_vec(), deletions.to_vec())
}

#[test]
fn merged_positions_are_sorted_and_unique() {
	let a = adj(&[7, 2], &[2, 4, 9]);
	assert_eq!(a.removed().collect::<Vec<_>>(), vec![2, 4, 7, 9]);
}

#[test]
fn strip_text_drops_removed_chars() {
	// "Haus¹ und Hoff" with a footnote anchor at 4 and a deleted "f" at 13.
	let a = adj(&[4], &[13]);
	assert_eq!(a.strip_text("Haus¹ und Hoff"), "Haus und Hof");
	assert_eq!(Adjustments::default().strip_text("unchanged"), "unchanged");
}

#[test]
fn removed_position_before_span_shifts_it() {
	let a = adj(&[1], &[]);
	assert_eq!(a.correct_span(4, 3), (5, 3));
}

#[test]
fn removed_position_at_span_start_shifts_it() {
	let a = adj(&[], &[4]);
	assert_eq!(a.correct_span(4, 3), (5, 3));
	assert_eq!(a.strip_span(5, 3), (4, 3));
}

#[test]
fn removed_position_inside_span_widens_it() {
	let a = adj(&[5], &[]);
	assert_eq!(a.correct_span(4, 3), (4, 4));
	assert_eq!(a.strip_span(4, 4), (4, 3));
}

#[test]
fn removed_position_at_span_end_is_left_alone() {
	let a = adj(&[7], &[]);
	assert_eq!(a.correct_span(4, 3), (4, 3));
	assert_eq!(a.strip_span(4, 3), (4, 3));
}

#[test]
fn consecutive_removed_positions_at_start() {
	let a = adj(&[2], &[3]);
	assert_eq!(a.correct_span(2, 2), (4, 2));
	assert_eq!(a.correct_offset(2), 4);
}

#[test]
fn empty_span_moves_past_removed_prefix() {
	let a = adj(&[0, 1], &[]);
	assert_eq!(a.correct_span(0, 0), (2, 0));
	assert_eq!(a.strip_span(2, 0), (0, 0));
}

fn text_and_adjustments() -> impl Strategy<Value = (String, Adjustments)> {
	"[a-z ]{0,40}".prop_flat_map(|text| {
		let len = text.chars().count();
		let positions = prop::collection::vec(0..len.max(1), 0..8);
		(Just(text), positions.clone(), positions).prop_map(move |(text, f, d)| {
			let f = f.into_iter().filter(|&p| p < len).collect();
			let d = d.into_iter().filter(|&p| p < len).collect();
			(text, Adjustments::new(f, d))
		})
	})
}

proptest! {
	#[test]
	fn strip_is_left_inverse_of_correct(
		footnotes in prop::collection::vec(0usize..60, 0..10),
		deletions in prop::collection::vec(0usize..60, 0..10),
		start in 0usize..50,
		length in 0usize..12,
	) {
		let a = Adjustments::new(footnotes, deletions);
		let (host_start, host_length) = a.correct_span(start, length);
		prop_assert!(host_start >= start);
		prop_assert!(host_length >= length);
		prop_assert_eq!(a.strip_span(host_start, host_length), (start, length));
	}

	#[test]
	fn corrected_span_covers_the_same_characters(
		(text, a) in text_and_adjustments(),
		start in 0usize..40,
		length in 0usize..10,
	) {
		let stripped: Vec<char> = a.strip_text(&text).chars().collect();
		prop_assume!(start + length <= stripped.len());
		let (host_start, host_length) = a.correct_span(start, length);
		let removed: Vec<usize> = a.removed().collect();
		let host: Vec<char> = text
			.chars()
			.enumerate()
			.skip(host_start)
			.take(host_length)
			.filter(|(i, _)| !removed.contains(i))
			.map(|(_, c)| c)
			.collect();
		prop_assert_eq!(&host[..], &stripped[start..start + length]);
		if length > 0 {
			prop_assert!(!removed.contains(&host_start));
		}
	}
}
