#![no_main]
use kingside::chess::game::Game;
use kingside::chess::notation;
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(request) = notation::parse(input) else {
        return;
    };
    // Printing the request back gives the normalized input.
    assert_eq!(notation::parse(&request.to_string()).unwrap(), request);
    let mut game = Game::new();
    let before = game.clone();
    if game.play(input).is_err() {
        assert_eq!(game, before);
    }
});
