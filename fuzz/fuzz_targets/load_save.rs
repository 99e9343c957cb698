#![no_main]
use kingside::chess::save;
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;

fuzz_target!(|data: &[u8]| {
    if let Ok(game) = save::load(data) {
        // Anything that loads is a complete save and is written back as is.
        assert_eq!(save::save(&game), data);
        assert!(game.position().is_legal());
    }
});
