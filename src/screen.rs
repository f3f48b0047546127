pub mod shelf;
pub mod watchlist;

pub use shelf::Shelf;
pub use watchlist::Watchlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Shelf,
    Watchlist,
}
