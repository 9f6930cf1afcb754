mod account;
mod import;
mod journal;
mod order;
mod price;
mod reporting;
mod source;
mod transaction;
mod watchlist;

pub use account::{AccountHolder, Exchange, SaveAccountHolder, SaveExchange};
pub use import::{ImportAction, ImportRequest, ImportRow, ImportRowStatus, ImportSession, ImportSummary, RowResolution};
pub use journal::{
    CloseJournalEntry, CreateJournalEntry, ExecuteJournalEntry, ExecutedJournalEntry, JournalEntry,
    JournalEntryView, JournalQuery, JournalStatus, TradeDirection, UpdateJournalEntry,
};
pub use order::{
    CreatePendingOrder, HolderQuery, Notification, NotificationStatus, OrderStatus, OrderType,
    PendingOrder, UpdatePendingOrder,
};
pub use price::{BatchPriceRequest, HistoricalPrice, PriceQuote, PriceValue};
pub use reporting::{
    DailyPerformance, DailyTransaction, ExchangeRealizedPl, LotAsOf, PortfolioOverviewRow,
    PositionsReport, RealizedPlRange, RealizedPlSummary, ReportQuery,
};
pub use source::{AdviceSource, CreateDocument, Document, SaveAdviceSource, SaveSourceNote, SourceDetails, SourceNote, SourceQuery};
pub use transaction::{
    CreateTransaction, CreatedTransactions, LotAllocation, NewTransaction, SaleWithPl, Transaction,
    TransactionQuery, TransactionType, UpdateTransaction,
};
pub use watchlist::{SaveWatchlistItem, WatchlistItem, WatchlistItemView, WatchlistQuery, WatchlistStatus};
