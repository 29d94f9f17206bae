mod request_list;
mod session_detail;
mod session_search;

pub use request_list::{RequestListMsg, RequestListRequest, RequestListState};
pub use session_detail::{DetailMsg, DetailRequest, SessionDetailState};
pub use session_search::{SearchMsg, SearchRequest, SessionFilter, SessionSearchState};
