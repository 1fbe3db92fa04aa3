use crate::CommunicatorError;
use async_trait::async_trait;
use fairdraw_draw::{DrawEvent, DrawSnapshot, Stakeholder};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub type DrawEventStream = BoxStream<'static, DrawEvent>;
pub type DrawsListStream = BoxStream<'static, Vec<DrawSnapshot>>;

/// What a peer presents when it connects.
#[derive(Clone, Debug)]
pub struct ConnectionParams {
    pub user: Stakeholder,
    pub auth_token: Option<String>,
    pub endpoint: Option<String>,
}

impl ConnectionParams {
    pub fn new(user: Stakeholder) -> Self {
        Self {
            user,
            auth_token: None,
            endpoint: None,
        }
    }
}

/// An open session with the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub user: Stakeholder,
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse<T> {
    pub page: usize,
    pub page_count: usize,
    pub total_count: usize,
    pub items: Vec<T>,
}

impl<T: Clone> PaginationResponse<T> {
    /// Slice `all` into 1-based page `page` of `per_page` items.
    pub fn paginate(all: &[T], page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total_count = all.len();
        let page_count = total_count.div_ceil(per_page);
        let items = all
            .iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect();
        Self {
            page,
            page_count,
            total_count,
            items,
        }
    }
}

/// Delivers draw events between peers.
///
/// Delivery is at-least-once per draw; ordering across peers is not
/// guaranteed. Implementations must echo a peer's own posts back to its
/// `listen` stream.
#[async_trait]
pub trait Communicator: Send + Sync {
    async fn open_connection(&self, params: ConnectionParams) -> Result<Connection, CommunicatorError>;

    async fn close_connection(&self) -> Result<(), CommunicatorError>;

    async fn get_draws_list(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<PaginationResponse<DrawSnapshot>, CommunicatorError>;

    async fn subscribe_to_draws_list(&self) -> Result<DrawsListStream, CommunicatorError>;

    /// Store a new draw and announce it. Returns the `DRAW_CREATED` event.
    async fn create_draw(&self, draw: DrawSnapshot) -> Result<DrawEvent, CommunicatorError>;

    async fn get_draw(&self, uuid: &str) -> Result<DrawSnapshot, CommunicatorError>;

    /// Add the connected user as a candidate and announce it to the draw.
    async fn join_draw(&self, uuid: &str) -> Result<(), CommunicatorError>;

    async fn leave_draw(&self, uuid: &str) -> Result<(), CommunicatorError>;

    /// Send to every connected user.
    async fn broadcast(&self, event: DrawEvent) -> Result<(), CommunicatorError>;

    /// Send to everyone listening to draw `uuid`.
    async fn post(&self, event: DrawEvent, uuid: &str) -> Result<(), CommunicatorError>;

    async fn listen(&self, uuid: &str) -> Result<DrawEventStream, CommunicatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_one_based() {
        let all: Vec<u32> = (0..7).collect();
        let first = PaginationResponse::paginate(&all, 1, 3);
        assert_eq!(first.items, vec![0, 1, 2]);
        assert_eq!(first.page_count, 3);
        let last = PaginationResponse::paginate(&all, 3, 3);
        assert_eq!(last.items, vec![6]);
        assert!(PaginationResponse::paginate(&all, 4, 3).items.is_empty());
    }

    #[test]
    fn far_page_is_empty_instead_of_overflowing() {
        let all: Vec<u32> = (0..7).collect();
        let page = PaginationResponse::paginate(&all, usize::MAX, 3);
        assert!(page.items.is_empty());
        assert_eq!(page.page, usize::MAX);
        assert_eq!(page.total_count, 7);
    }

    #[test]
    fn pagination_wire_names() {
        let page = PaginationResponse::paginate(&[1u8], 1, 25);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["pageCount"], 1);
        assert_eq!(value["totalCount"], 1);
    }
}
