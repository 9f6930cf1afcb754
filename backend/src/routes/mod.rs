pub(crate) mod accounts;
pub(crate) mod documents;
pub(crate) mod health;
pub(crate) mod imports;
pub(crate) mod journal;
pub(crate) mod orders;
pub(crate) mod prices;
pub(crate) mod reporting;
pub(crate) mod sources;
pub(crate) mod transactions;
pub(crate) mod watchlist;
