use chrono::{DateTime, Duration, TimeZone, Utc};
use computer_club_booking::domain::model::{
    BookingHours, ClubId, Money, Reservation, ReservationId, ReservationStatus, SeatNumber,
    TimeWindow, UserId,
};
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
}

fn window(start_hour: i64, hours: u32) -> TimeWindow {
    TimeWindow::starting_at(
        base() + Duration::hours(start_hour),
        BookingHours::new(hours).unwrap(),
    )
    .unwrap()
}

fn book(start_hour: i64, hours: u32, rate: i64) -> Reservation {
    Reservation::book(
        ReservationId::new(),
        ClubId::new("club1").unwrap(),
        SeatNumber::new(1).unwrap(),
        UserId::new("u1").unwrap(),
        base() + Duration::hours(start_hour),
        BookingHours::new(hours).unwrap(),
        Money::new(rate),
        base(),
    )
    .unwrap()
}

// 時間帯の重なり判定のプロパティベーステスト
proptest! {
    /// 重なり判定は対称である
    #[test]
    fn test_overlap_is_symmetric(
        start1 in 0i64..200,
        hours1 in 1u32..12,
        start2 in 0i64..200,
        hours2 in 1u32..12,
    ) {
        let a = window(start1, hours1);
        let b = window(start2, hours2);
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    /// 半開区間なので、終了時刻ちょうどに始まる時間帯とは重ならない
    #[test]
    fn test_adjacent_windows_do_not_overlap(
        start in 0i64..200,
        hours1 in 1u32..12,
        hours2 in 1u32..12,
    ) {
        let first = window(start, hours1);
        let next = window(start + i64::from(hours1), hours2);
        prop_assert!(!first.overlaps(&next));
        prop_assert!(!next.overlaps(&first));
    }

    /// 同じ開始時刻の時間帯は常に重なる
    #[test]
    fn test_same_start_always_overlaps(
        start in 0i64..200,
        hours1 in 1u32..12,
        hours2 in 1u32..12,
    ) {
        prop_assert!(window(start, hours1).overlaps(&window(start, hours2)));
    }

    /// 重なり判定は s1 < e2 かつ s2 < e1 と一致する
    #[test]
    fn test_overlap_matches_interval_definition(
        start1 in 0i64..100,
        hours1 in 1u32..12,
        start2 in 0i64..100,
        hours2 in 1u32..12,
    ) {
        let e1 = start1 + i64::from(hours1);
        let e2 = start2 + i64::from(hours2);
        let expected = start1 < e2 && start2 < e1;
        prop_assert_eq!(window(start1, hours1).overlaps(&window(start2, hours2)), expected);
    }
}

// 予約の料金と終了時刻のプロパティベーステスト
proptest! {
    /// 合計金額は常に時間数 × 時間料金
    #[test]
    fn test_total_price_is_hours_times_rate(
        start in 1i64..500,
        hours in 1u32..24,
        rate in 1i64..100_000,
    ) {
        let reservation = book(start, hours, rate);
        prop_assert_eq!(reservation.total_price().amount(), i64::from(hours) * rate);
    }

    /// 終了時刻は常に開始時刻 + 時間数
    #[test]
    fn test_end_time_is_start_plus_hours(
        start in 1i64..500,
        hours in 1u32..24,
    ) {
        let reservation = book(start, hours, 10);
        prop_assert_eq!(
            reservation.end_time() - reservation.start_time(),
            Duration::hours(i64::from(hours))
        );
    }

    /// 乗算がオーバーフローする場合はエラーになる
    #[test]
    fn test_money_multiply_overflow_is_rejected(
        factor in 2u32..1000,
    ) {
        prop_assert!(Money::new(i64::MAX).multiply(factor).is_err());
    }
}

// 実効ステータスのプロパティベーステスト
proptest! {
    /// Activeの予約は終了時刻以降に参照するとCompletedになり、それより前はActiveのまま
    #[test]
    fn test_effective_status_completes_after_end(
        start in 1i64..200,
        hours in 1u32..12,
        offset in -300i64..300,
    ) {
        let reservation = book(start, hours, 10);
        let now = reservation.end_time() + Duration::minutes(offset);
        let expected = if offset >= 0 {
            ReservationStatus::Completed
        } else {
            ReservationStatus::Active
        };
        prop_assert_eq!(reservation.effective_status(now), expected);
    }

    /// Cancelledは時刻にかかわらずCancelledのまま
    #[test]
    fn test_cancelled_is_terminal(
        minutes_after in 0i64..10_000,
    ) {
        let end = base() + Duration::hours(3);
        let now = base() + Duration::minutes(minutes_after);
        prop_assert_eq!(
            ReservationStatus::Cancelled.effective_at(end, now),
            ReservationStatus::Cancelled
        );
    }

    /// キャンセル受付は開始1時間前より前のみ
    #[test]
    fn test_cancellation_window(
        start in 1i64..48,
        minutes_before_start in 0i64..180,
    ) {
        let reservation = book(start, 2, 10);
        let now = reservation.start_time() - Duration::minutes(minutes_before_start);
        let owner = UserId::new("u1").unwrap();
        let result = reservation.ensure_cancellable(&owner, now);
        prop_assert_eq!(result.is_ok(), minutes_before_start > 60);
    }
}
