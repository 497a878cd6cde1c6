/// CSV writers for scenario records and issue overviews.
pub mod export;
