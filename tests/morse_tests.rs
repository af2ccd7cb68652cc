//! Integration tests for Morse tables and the symbol decoder.

use heapless::Vec as HVec;

use rust_cw_keyboard::decoder::MorseDecoder;
use rust_cw_keyboard::morse::{self, Symbols, BACKSPACE, PROSIGNS};
use rust_cw_keyboard::symbol::Symbol;

type Out = HVec<u8, 16>;

fn decode(symbols: impl IntoIterator<Item = Symbol>) -> Out {
    let mut dec = MorseDecoder::new();
    let mut out = Out::new();
    for s in symbols {
        dec.feed(s, &mut out);
    }
    out
}

fn pattern(bits: u16) -> Vec<Symbol> {
    let width = 16 - bits.leading_zeros() - 1;
    (0..width)
        .rev()
        .map(|i| if bits & (1 << i) != 0 { Symbol::Dah } else { Symbol::Dit })
        .collect()
}

#[test]
fn test_every_encodable_byte_round_trips() {
    for byte in 0x21u8..0x80 {
        let Some(elements) = morse::symbols_for(byte) else {
            continue;
        };
        let got = decode(elements.chain([Symbol::Space]));

        let expected: &[u8] = match byte {
            b'$' => b"/$",
            b'`' => b"'",
            _ => &[byte.to_ascii_lowercase()],
        };
        assert_eq!(&got[..], expected, "round trip of {:?}", byte as char);
    }
}

#[test]
fn test_space_is_word_gap() {
    assert_eq!(morse::pattern_for(b' '), Some(0x01));
    assert_eq!(morse::symbols_for(b' ').map(|s| s.len()), Some(0));
    assert_eq!(&decode([Symbol::Space])[..], b" ");
}

#[test]
fn test_unmapped_bytes() {
    for byte in [b'#', b'%', b'&', b'*', b'<', b'>', b'@', b'[', b'~', 0x00, 0x7f, 0x80, 0xff] {
        assert!(morse::pattern_for(byte).is_none(), "{:#04x} should have no code", byte);
    }
}

#[test]
fn test_prosigns_decode_with_marker() {
    for p in PROSIGNS {
        let got = decode(pattern(p.bits).into_iter().chain([Symbol::Space]));
        if let Some(c) = morse::lookup(p.bits) {
            // AR, BT and NR share their pattern with '+', '=' and '/'.
            assert_eq!(&got[..], [c], "prosign {} is shadowed", p.text);
        } else if p.is_backspace() {
            assert_eq!(&got[..], [BACKSPACE]);
        } else {
            let mut expected = vec![b'/'];
            expected.extend_from_slice(p.text.as_bytes());
            assert_eq!(&got[..], &expected[..], "prosign {}", p.text);
        }
    }
}

#[test]
fn test_shadowed_prosigns() {
    let shadowed: Vec<&str> = PROSIGNS
        .iter()
        .filter(|p| morse::lookup(p.bits).is_some())
        .map(|p| p.text)
        .collect();
    assert_eq!(shadowed, ["AR", "BT", "NR"]);
}

#[test]
fn test_sos_run_together_is_prosign() {
    let sos = "...---...".chars().map(|c| if c == '.' { Symbol::Dit } else { Symbol::Dah });
    assert_eq!(&decode(sos.chain([Symbol::Space]))[..], b"/SOS");
}

#[test]
fn test_sos_letters_decode_lowercase() {
    let mut symbols = Vec::new();
    for c in b"SOS" {
        symbols.extend(morse::symbols_for(*c).unwrap());
        symbols.push(Symbol::Space);
    }
    symbols.push(Symbol::Space);
    assert_eq!(&decode(symbols)[..], b"sos ");
}

#[test]
fn test_eleven_dits_decode_nothing() {
    let got = decode(std::iter::repeat(Symbol::Dit).take(11).chain([Symbol::Space, Symbol::Space]));
    assert_eq!(&got[..], b" ", "Overflowed letter is dropped, decoder recovers");
}

#[test]
fn test_symbols_iterator_is_msb_first() {
    // L = .-..
    let got: Vec<Symbol> = Symbols::new(0x14).collect();
    assert_eq!(got, [Symbol::Dit, Symbol::Dah, Symbol::Dit, Symbol::Dit]);
    assert_eq!(Symbols::new(0x14).len(), 4);
}

#[test]
fn test_lookup_bounds() {
    assert_eq!(morse::lookup(0x00), None);
    assert_eq!(morse::lookup(0x01), None, "Bare seed is resolved by the decoder, not the table");
    assert_eq!(morse::lookup(0x02), Some(b'e'));
    assert_eq!(morse::lookup(0x7f), None);
    assert_eq!(morse::lookup(0x89), None);
}
