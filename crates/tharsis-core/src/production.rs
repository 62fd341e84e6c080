//! End-of-generation production.
//!
//! Pure functions over boards; locking, persistence and events are the
//! [`GenerationCoordinator`](crate::generation::GenerationCoordinator)'s
//! job.

use tharsis_types::{Board, Roster};

/// Apply one generation of production to `board`.
///
/// Income is terraform rating plus money production. Energy left over
/// from the last generation converts into heat before energy is refilled
/// from its production, so the heat step must read the old energy amount.
pub const fn produce(board: &mut Board) {
    let income = board
        .terraformation
        .amount
        .saturating_add(board.money.generation);
    board.money.amount = board.money.amount.saturating_add(income);

    board.titanium.produce();
    board.plants.produce();

    let prior_energy = board.energy.amount;
    board.energy.amount = board.energy.generation;
    board.heat.amount = board
        .heat
        .amount
        .saturating_add(prior_energy)
        .saturating_add(board.heat.generation);
}

/// Close the generation for every joined seat: produce on regular boards
/// and clear everyone's `doneGen` flag. Empty seats are left alone.
pub fn close_generation(roster: &mut Roster) {
    for (_, board) in roster.active_boards_mut() {
        if !board.simple_board {
            produce(board);
        }
        board.done_generation = false;
    }
}
