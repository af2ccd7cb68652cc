//! Integration tests for the paddle keyer.
//!
//! Tests the keying modes end to end at 20 wpm:
//! - Single paddle repetition
//! - Squeeze alternation (iambic only) and the iambic-B trailing element
//! - Ultimatic repetition of the newest paddle
//! - Letter space after release

use rust_cw_keyboard::keyer::{Keyer, KeyerState, KeyingMode, Paddle, PaddleEvent, Timing};
use rust_cw_keyboard::symbol::{Symbol, SymbolQueue};

use Paddle::{Left, Right};
use PaddleEvent::{Press, Release};
use Symbol::{Dah, Dit, Space};

fn keyer(mode: KeyingMode) -> Keyer {
    let mut k = Keyer::new();
    k.set_mode(mode);
    k.set_timing(Timing::from_wpm(20));
    k
}

fn run(k: &mut Keyer, q: &SymbolQueue, ticks: u32) {
    for _ in 0..ticks {
        k.tick(q);
    }
}

fn drain(q: &SymbolQueue) -> Vec<Symbol> {
    std::iter::from_fn(|| q.pop()).collect()
}

/// Press left, then right, release right then left, one tick between each.
fn squeeze_once(mode: KeyingMode) -> Vec<Symbol> {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(mode);

    k.paddle(Press(Left), 0, &q);
    k.tick(&q);
    k.paddle(Press(Right), 1, &q);
    k.tick(&q);
    k.paddle(Release(Right), 2, &q);
    k.paddle(Release(Left), 2, &q);
    drain(&q)
}

#[test]
fn test_iambic_b_appends_trailing_element() {
    assert_eq!(squeeze_once(KeyingMode::IambicB), [Dit, Dah, Dit]);
}

#[test]
fn test_iambic_a_stops_on_release() {
    assert_eq!(squeeze_once(KeyingMode::IambicA), [Dit, Dah]);
}

#[test]
fn test_non_iambic_modes_do_not_alternate() {
    for mode in [KeyingMode::Bug, KeyingMode::Straight, KeyingMode::Paddle] {
        let q = SymbolQueue::new(Space);
        let mut k = keyer(mode);

        k.paddle(Press(Left), 0, &q);
        k.tick(&q);
        k.paddle(Press(Right), 1, &q);
        run(&mut k, &q, 600);

        // Dah keyed at 2, 242 and 482 ms.
        assert_eq!(drain(&q), [Dit, Dah, Dah, Dah], "{} squeeze repeats the newest paddle", mode);
    }
}

#[test]
fn test_bug_squeeze_release_adds_nothing() {
    assert_eq!(squeeze_once(KeyingMode::Bug), [Dit, Dah]);
}

#[test]
fn test_single_paddle_repeats_every_element_period() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::IambicB);

    k.paddle(Press(Left), 0, &q);
    let mut emitted_at = Vec::new();
    for t in 1..=400u32 {
        k.tick(&q);
        if q.pop().is_some() {
            emitted_at.push(t);
        }
    }
    assert_eq!(emitted_at, [1, 121, 241, 361], "Dit repeats every 2 dit lengths (120 ms)");
}

#[test]
fn test_dah_paddle_repeats_every_four_units() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::IambicA);

    k.paddle(Press(Right), 0, &q);
    run(&mut k, &q, 481);
    assert_eq!(drain(&q), [Dah, Dah, Dah]);
}

#[test]
fn test_squeeze_alternates() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::IambicA);

    k.paddle(Press(Left), 0, &q);
    k.tick(&q);
    k.paddle(Press(Right), 1, &q);
    assert_eq!(k.state(), KeyerState::BothHeld);
    run(&mut k, &q, 600);

    let got = drain(&q);
    assert!(got.len() >= 4);
    for pair in got.windows(2) {
        assert_ne!(pair[0], pair[1], "Squeeze must alternate: {:?}", got);
    }
}

#[test]
fn test_ultimatic_repeats_newest_paddle() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::Ultimatic);

    k.paddle(Press(Left), 0, &q);
    k.tick(&q);
    k.paddle(Press(Right), 1, &q);
    run(&mut k, &q, 500);

    let got = drain(&q);
    assert_eq!(got[0], Dit);
    assert!(got[1..].iter().all(|&s| s == Dah), "Newest paddle wins: {:?}", got);
}

#[test]
fn test_letter_space_after_release() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::IambicB);

    k.paddle(Press(Right), 0, &q);
    k.tick(&q);
    k.paddle(Release(Right), 1, &q);
    assert_eq!(k.state(), KeyerState::Idle);
    assert_eq!(drain(&q), [Dah]);

    run(&mut k, &q, 120);
    assert!(q.is_empty(), "No space before two dit lengths of idle");
    k.tick(&q);
    assert_eq!(drain(&q), [Space]);

    run(&mut k, &q, 1000);
    assert!(q.is_empty(), "Only one space per idle period");
}

#[test]
fn test_no_space_at_boot() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::Bug);
    run(&mut k, &q, 1000);
    assert!(q.is_empty());
}

#[test]
fn test_swapped_paddles() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::IambicA);
    k.set_left(Dah);

    k.paddle(Press(Left), 0, &q);
    k.tick(&q);
    assert_eq!(drain(&q), [Dah]);
    assert_eq!(k.symbol_for(Right), Dit);
}

#[test]
fn test_invalid_edges_keep_state() {
    let q = SymbolQueue::new(Space);
    let mut k = keyer(KeyingMode::IambicB);

    k.paddle(Release(Left), 0, &q);
    assert_eq!(k.state(), KeyerState::Idle);

    k.paddle(Press(Left), 0, &q);
    k.paddle(Press(Left), 0, &q);
    assert_eq!(k.state(), KeyerState::LeftHeld);
    assert!(q.is_empty());
}

#[test]
fn test_keying_mode_names_round_trip() {
    for mode in KeyingMode::ALL {
        assert_eq!(KeyingMode::from_u8(mode as u8), Some(mode));
        assert!(!mode.name().is_empty());
    }
    assert!(KeyingMode::IambicA.is_iambic());
    assert!(!KeyingMode::Straight.is_iambic());
}

proptest::proptest! {
    /// Speeds inside 3..=99 are used as given, everything else becomes 13 wpm.
    #[test]
    fn speed_clamps(wpm in 0u8..=255) {
        let t = Timing::from_wpm(wpm);
        if (3..=99).contains(&wpm) {
            assert_eq!(t.wpm(), wpm);
        } else {
            assert_eq!(t.wpm(), 13);
        }
        assert_eq!(t.dit_ms(), 1200 / u16::from(t.wpm()));
        assert_eq!(t.dah_ms(), 3 * t.dit_ms());
        assert_eq!(t.period(Dah), 2 * t.period(Dit));
    }
}
