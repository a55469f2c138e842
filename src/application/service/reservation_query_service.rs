use crate::application::service::{within_timeout, DEFAULT_STORE_TIMEOUT};
use crate::application::ApplicationError;
use crate::domain::model::{Reservation, ReservationStatus, UserId};
use crate::domain::port::{Clock, ClubRepository, ReservationRepository};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 一覧表示用の予約
/// ステータスは読み出し時点の実効ステータス
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationView {
    pub reservation: Reservation,
    pub status: ReservationStatus,
    /// クラブが解決できなかった場合は `None`
    pub club_name: Option<String>,
}

/// 予約クエリサービス
/// 読み取り専用の予約操作を提供する
pub struct ReservationQueryService {
    reservation_repository: Arc<dyn ReservationRepository>,
    club_repository: Arc<dyn ClubRepository>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl ReservationQueryService {
    /// 新しい予約クエリサービスを作成
    ///
    /// # Arguments
    /// * `reservation_repository` - 予約リポジトリ
    /// * `club_repository` - クラブ名の解決に使うクラブリポジトリ
    /// * `clock` - 実効ステータスの判定に使う時刻
    pub fn new(
        reservation_repository: Arc<dyn ReservationRepository>,
        club_repository: Arc<dyn ClubRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservation_repository,
            club_repository,
            clock,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// 利用者の予約一覧を取得
    /// 開始時刻の昇順で並べて返す
    ///
    /// # Arguments
    /// * `user_id` - 利用者ID
    ///
    /// # Returns
    /// * `Ok(Vec<ReservationView>)` - 予約のリスト（予約がなければ空）
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn get_user_reservations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ReservationView>, ApplicationError> {
        let mut reservations = within_timeout(
            self.store_timeout,
            "find_reservations_by_user",
            self.reservation_repository.find_by_user(user_id),
        )
        .await?;
        reservations.sort_by_key(Reservation::start_time);

        let now = self.clock.now();
        let mut club_names: HashMap<String, Option<String>> = HashMap::new();
        let mut views = Vec::with_capacity(reservations.len());

        for reservation in reservations {
            let key = reservation.club_id().as_str().to_string();
            if !club_names.contains_key(&key) {
                let club = within_timeout(
                    self.store_timeout,
                    "find_club",
                    self.club_repository.find_by_id(reservation.club_id()),
                )
                .await?;
                club_names.insert(key.clone(), club.map(|c| c.name().to_string()));
            }

            views.push(ReservationView {
                status: reservation.effective_status(now),
                club_name: club_names.get(&key).cloned().flatten(),
                reservation,
            });
        }

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        BookingHours, Club, ClubId, Money, ReservationId, SeatNumber,
    };
    use crate::domain::port::RepositoryError;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    // テスト用のモックリポジトリ
    struct MockReservationRepository {
        reservations: Mutex<Vec<Reservation>>,
    }

    #[async_trait]
    impl ReservationRepository for MockReservationRepository {
        async fn find_by_id(
            &self,
            reservation_id: ReservationId,
        ) -> Result<Option<Reservation>, RepositoryError> {
            let reservations = self.reservations.lock().unwrap();
            Ok(reservations.iter().find(|r| r.id() == reservation_id).cloned())
        }

        async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Reservation>, RepositoryError> {
            let reservations = self.reservations.lock().unwrap();
            Ok(reservations
                .iter()
                .filter(|r| r.user_id() == user_id)
                .cloned()
                .collect())
        }
    }

    struct MockClubRepository {
        clubs: Vec<Club>,
    }

    #[async_trait]
    impl ClubRepository for MockClubRepository {
        async fn insert(&self, _club: &Club) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn find_by_id(&self, club_id: &ClubId) -> Result<Option<Club>, RepositoryError> {
            Ok(self.clubs.iter().find(|c| c.id() == club_id).cloned())
        }

        async fn find_all(&self) -> Result<Vec<Club>, RepositoryError> {
            Ok(self.clubs.clone())
        }
    }

    struct StaticClock(DateTime<Utc>);

    impl Clock for StaticClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn booking(club: &str, user: &str, hours_ahead: i64) -> Reservation {
        Reservation::book(
            ReservationId::new(),
            ClubId::new(club).unwrap(),
            SeatNumber::new(1).unwrap(),
            UserId::new(user).unwrap(),
            now() + ChronoDuration::hours(hours_ahead),
            BookingHours::new(1).unwrap(),
            Money::new(10),
            now(),
        )
        .unwrap()
    }

    fn service(reservations: Vec<Reservation>, at: DateTime<Utc>) -> ReservationQueryService {
        let club = Club::reconstruct(
            ClubId::new("club1").unwrap(),
            "Arena".to_string(),
            "Tokyo".to_string(),
            Money::new(10),
            1,
        );
        ReservationQueryService::new(
            Arc::new(MockReservationRepository {
                reservations: Mutex::new(reservations),
            }),
            Arc::new(MockClubRepository { clubs: vec![club] }),
            Arc::new(StaticClock(at)),
        )
    }

    #[tokio::test]
    async fn test_user_reservations_ordered_by_start_time() {
        let later = booking("club1", "u1", 5);
        let sooner = booking("club1", "u1", 2);
        let other_user = booking("club1", "u2", 3);
        let service = service(vec![later.clone(), sooner.clone(), other_user], now());

        let views = service
            .get_user_reservations(&UserId::new("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].reservation.id(), sooner.id());
        assert_eq!(views[1].reservation.id(), later.id());
        assert_eq!(views[0].club_name.as_deref(), Some("Arena"));
    }

    #[tokio::test]
    async fn test_elapsed_reservation_reports_completed() {
        let past = booking("club1", "u1", 2);
        let service = service(vec![past], now() + ChronoDuration::hours(4));

        let views = service
            .get_user_reservations(&UserId::new("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(views[0].status, ReservationStatus::Completed);
        assert_eq!(views[0].reservation.status(), ReservationStatus::Active);
    }

    #[tokio::test]
    async fn test_unknown_club_has_no_name() {
        let orphan = booking("closed-club", "u1", 2);
        let service = service(vec![orphan], now());

        let views = service
            .get_user_reservations(&UserId::new("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(views[0].club_name, None);
    }

    #[tokio::test]
    async fn test_user_without_reservations() {
        let service = service(vec![], now());
        let views = service
            .get_user_reservations(&UserId::new("nobody").unwrap())
            .await
            .unwrap();
        assert!(views.is_empty());
    }
}
