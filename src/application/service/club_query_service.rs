use crate::application::service::{within_timeout, DEFAULT_STORE_TIMEOUT};
use crate::application::ApplicationError;
use crate::domain::model::{Club, ClubId, Seat};
use crate::domain::port::{ClubRepository, SeatRepository};
use std::sync::Arc;
use std::time::Duration;

/// クラブクエリサービス
/// クラブと座席の読み取り専用操作を提供する
pub struct ClubQueryService {
    club_repository: Arc<dyn ClubRepository>,
    seat_repository: Arc<dyn SeatRepository>,
    store_timeout: Duration,
}

impl ClubQueryService {
    /// 新しいクラブクエリサービスを作成
    ///
    /// # Arguments
    /// * `club_repository` - クラブリポジトリ
    /// * `seat_repository` - 座席リポジトリ
    pub fn new(
        club_repository: Arc<dyn ClubRepository>,
        seat_repository: Arc<dyn SeatRepository>,
    ) -> Self {
        Self {
            club_repository,
            seat_repository,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// すべてのクラブを取得
    /// 名前の昇順で並べて返す
    pub async fn get_all_clubs(&self) -> Result<Vec<Club>, ApplicationError> {
        within_timeout(self.store_timeout, "find_all_clubs", self.club_repository.find_all()).await
    }

    /// すべてのクラブの座席を取得
    /// クラブID、座席番号の順に並べて返す
    pub async fn get_all_seats(&self) -> Result<Vec<Seat>, ApplicationError> {
        within_timeout(self.store_timeout, "find_all_seats", self.seat_repository.find_all()).await
    }

    /// クラブIDでクラブを取得
    ///
    /// # Returns
    /// * `Ok(Some(Club))` - クラブが見つかった
    /// * `Ok(None)` - クラブが見つからなかった
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn get_club_by_id(&self, club_id: &ClubId) -> Result<Option<Club>, ApplicationError> {
        within_timeout(
            self.store_timeout,
            "find_club",
            self.club_repository.find_by_id(club_id),
        )
        .await
    }

    /// クラブの座席一覧を取得
    /// 座席番号の昇順。利用可能フラグは参考値
    ///
    /// # Returns
    /// * `Ok(Vec<Seat>)` - 座席のリスト
    /// * `Err(ApplicationError::NotFound)` - クラブが存在しない
    pub async fn get_seats_by_club(&self, club_id: &ClubId) -> Result<Vec<Seat>, ApplicationError> {
        if self.get_club_by_id(club_id).await?.is_none() {
            return Err(ApplicationError::NotFound(format!(
                "クラブが見つかりません: {}",
                club_id
            )));
        }

        within_timeout(
            self.store_timeout,
            "find_seats",
            self.seat_repository.find_by_club(club_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{InMemoryStore, SystemClock};
    use crate::application::service::ClubApplicationService;
    use crate::application::ErrorKind;
    use crate::domain::model::Money;

    fn services() -> (ClubApplicationService, ClubQueryService) {
        let store = InMemoryStore::new();
        (
            ClubApplicationService::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(SystemClock),
            ),
            ClubQueryService::new(Arc::new(store.clone()), Arc::new(store)),
        )
    }

    #[tokio::test]
    async fn test_get_all_clubs_sorted_by_name() {
        let (commands, queries) = services();
        commands
            .register_club("Zeta".to_string(), "Osaka".to_string(), Money::new(5))
            .await
            .unwrap();
        commands
            .register_club("Alpha".to_string(), "Tokyo".to_string(), Money::new(7))
            .await
            .unwrap();

        let clubs = queries.get_all_clubs().await.unwrap();
        let names: Vec<&str> = clubs.iter().map(Club::name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn test_get_club_by_id_not_found() {
        let (_, queries) = services();
        let result = queries
            .get_club_by_id(&ClubId::new("missing").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_seats_by_club() {
        let (commands, queries) = services();
        let club = commands
            .register_club("Arena".to_string(), "Tokyo".to_string(), Money::new(10))
            .await
            .unwrap();
        commands
            .add_seats(club.id(), 3, "RTX 4070".to_string())
            .await
            .unwrap();

        let seats = queries.get_seats_by_club(club.id()).await.unwrap();
        let numbers: Vec<u32> = seats.iter().map(|s| s.seat_number().value()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(seats.iter().all(Seat::is_available));
    }

    #[tokio::test]
    async fn test_get_seats_for_unknown_club() {
        let (_, queries) = services();
        let err = queries
            .get_seats_by_club(&ClubId::new("missing").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_get_all_seats_across_clubs() {
        let (commands, queries) = services();
        let first = commands
            .register_club("Arena".to_string(), "Tokyo".to_string(), Money::new(10))
            .await
            .unwrap();
        let second = commands
            .register_club("Bunker".to_string(), "Osaka".to_string(), Money::new(8))
            .await
            .unwrap();
        commands.add_seats(first.id(), 2, "RTX".to_string()).await.unwrap();
        commands.add_seats(second.id(), 1, "GTX".to_string()).await.unwrap();

        let seats = queries.get_all_seats().await.unwrap();
        assert_eq!(seats.len(), 3);
        for pair in seats.windows(2) {
            let key = |s: &Seat| (s.club_id().as_str().to_string(), s.seat_number());
            assert!(key(&pair[0]) < key(&pair[1]));
        }
    }
}
