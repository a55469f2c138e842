// ドメインサービス
// 複数の集約にまたがる予約受付ルールを実装

use crate::domain::error::DomainError;
use crate::domain::model::{Reservation, ReservationId, TimeWindow};
use chrono::{DateTime, Utc};

/// 予約受付ポリシー
/// 受付可否の判定のみを行い、永続化には関与しない
pub struct BookingPolicy;

impl BookingPolicy {
    /// 開始時刻が現在より後であることを確認する
    pub fn ensure_starts_in_future(
        start_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if start_time <= now {
            return Err(DomainError::StartTimeNotInFuture);
        }
        Ok(())
    }

    /// 競合する予約が存在しないことを確認する
    ///
    /// # Arguments
    /// * `candidates` - 重複検索で得られた予約
    /// * `window` - 要求された時間帯
    /// * `now` - 現在時刻
    ///
    /// # Returns
    /// * `Ok(())` - 競合なし
    /// * `Err(DomainError::OverlappingReservation)` - 競合あり
    pub fn ensure_no_conflict(
        candidates: &[Reservation],
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        // ストア側の絞り込みに加えて述語をもう一度適用する
        let conflict = candidates.iter().any(|existing| {
            existing.conflicts_with(existing.club_id(), existing.seat_number(), window, now)
        });
        if conflict {
            return Err(DomainError::OverlappingReservation);
        }
        Ok(())
    }

    /// 競合している予約IDの一覧（ログ用）
    pub fn conflicting_ids(candidates: &[Reservation]) -> Vec<ReservationId> {
        candidates.iter().map(Reservation::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BookingHours, ClubId, Money, SeatNumber, UserId};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn existing(hours_ahead: i64, hours: u32) -> Reservation {
        Reservation::book(
            ReservationId::new(),
            ClubId::new("club1").unwrap(),
            SeatNumber::new(3).unwrap(),
            UserId::new("u1").unwrap(),
            now() + Duration::hours(hours_ahead),
            BookingHours::new(hours).unwrap(),
            Money::new(10),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_start_time_must_be_in_future() {
        assert!(BookingPolicy::ensure_starts_in_future(now() + Duration::seconds(1), now()).is_ok());
        assert_eq!(
            BookingPolicy::ensure_starts_in_future(now(), now()),
            Err(DomainError::StartTimeNotInFuture)
        );
        assert_eq!(
            BookingPolicy::ensure_starts_in_future(now() - Duration::hours(1), now()),
            Err(DomainError::StartTimeNotInFuture)
        );
    }

    #[test]
    fn test_no_candidates_is_admissible() {
        let window = TimeWindow::starting_at(now() + Duration::hours(1), BookingHours::new(1).unwrap())
            .unwrap();
        assert!(BookingPolicy::ensure_no_conflict(&[], &window, now()).is_ok());
    }

    #[test]
    fn test_overlapping_candidate_is_rejected() {
        let window = TimeWindow::starting_at(now() + Duration::hours(3), BookingHours::new(1).unwrap())
            .unwrap();
        let candidates = vec![existing(2, 2)];
        assert_eq!(
            BookingPolicy::ensure_no_conflict(&candidates, &window, now()),
            Err(DomainError::OverlappingReservation)
        );
    }

    #[test]
    fn test_cancelled_candidate_is_ignored() {
        let window = TimeWindow::starting_at(now() + Duration::hours(3), BookingHours::new(1).unwrap())
            .unwrap();
        let mut cancelled = existing(2, 2);
        cancelled.cancel(&UserId::new("u1").unwrap(), now()).unwrap();
        assert!(BookingPolicy::ensure_no_conflict(&[cancelled], &window, now()).is_ok());
    }
}
