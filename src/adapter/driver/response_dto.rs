use crate::application::service::ReservationView;
use crate::domain::model::{Club, Reservation, ReservationStatus, Seat};
use serde::Serialize;

/// クラブ用のレスポンスDTO
#[derive(Serialize)]
pub struct ClubResponse {
    pub club_id: String,
    pub name: String,
    pub address: String,
    pub price_per_hour: i64,
    pub available_seat_count: u32,
}

/// 座席用のレスポンスDTO
/// `available` は参考値
#[derive(Serialize)]
pub struct SeatResponse {
    pub seat_id: String,
    pub club_id: String,
    pub seat_number: u32,
    pub description: String,
    pub available: bool,
}

/// 予約用のレスポンスDTO
#[derive(Serialize)]
pub struct ReservationResponse {
    pub reservation_id: String,
    pub club_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_name: Option<String>,
    pub seat_number: u32,
    pub user_id: String,
    pub start_time: String,
    pub end_time: String,
    pub total_price: i64,
    pub status: String,
    pub created_at: String,
}

/// キャンセル結果用のレスポンスDTO
#[derive(Serialize)]
pub struct CancellationResponse {
    pub reservation_id: String,
    pub status: String,
}

impl ClubResponse {
    pub fn from_club(club: &Club) -> Self {
        Self {
            club_id: club.id().to_string(),
            name: club.name().to_string(),
            address: club.address().to_string(),
            price_per_hour: club.price_per_hour().amount(),
            available_seat_count: club.available_seat_count(),
        }
    }
}

impl SeatResponse {
    pub fn from_seat(seat: &Seat) -> Self {
        Self {
            seat_id: seat.id().to_string(),
            club_id: seat.club_id().to_string(),
            seat_number: seat.seat_number().value(),
            description: seat.description().to_string(),
            available: seat.is_available(),
        }
    }
}

impl ReservationResponse {
    /// ドメインオブジェクトからReservationResponseを作成
    /// `status` には呼び出し側で判定した実効ステータスを渡す
    pub fn from_reservation(
        reservation: &Reservation,
        status: ReservationStatus,
        club_name: Option<String>,
    ) -> Self {
        Self {
            reservation_id: reservation.id().to_string(),
            club_id: reservation.club_id().to_string(),
            club_name,
            seat_number: reservation.seat_number().value(),
            user_id: reservation.user_id().to_string(),
            start_time: reservation.start_time().to_rfc3339(),
            end_time: reservation.end_time().to_rfc3339(),
            total_price: reservation.total_price().amount(),
            status: status.to_string(),
            created_at: reservation.created_at().to_rfc3339(),
        }
    }

    pub fn from_view(view: &ReservationView) -> Self {
        Self::from_reservation(&view.reservation, view.status, view.club_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        BookingHours, ClubId, Money, ReservationId, SeatId, SeatNumber, UserId,
    };
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_reservation_response_uses_given_status() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let reservation = Reservation::book(
            ReservationId::new(),
            ClubId::new("club1").unwrap(),
            SeatNumber::new(3).unwrap(),
            UserId::new("u1").unwrap(),
            now + Duration::hours(2),
            BookingHours::new(2).unwrap(),
            Money::new(10),
            now,
        )
        .unwrap();

        let response =
            ReservationResponse::from_reservation(&reservation, ReservationStatus::Completed, None);
        assert_eq!(response.status, "Completed");
        assert_eq!(response.total_price, 20);
        assert_eq!(response.start_time, "2025-03-01T14:00:00+00:00");
        assert_eq!(response.end_time, "2025-03-01T16:00:00+00:00");

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("club_name"));
    }

    #[test]
    fn test_seat_response_from_seat() {
        let seat = Seat::new(
            SeatId::new(),
            ClubId::new("club1").unwrap(),
            SeatNumber::new(7).unwrap(),
            "RTX 4090".to_string(),
        );
        let response = SeatResponse::from_seat(&seat);
        assert_eq!(response.seat_number, 7);
        assert!(response.available);
        assert_eq!(response.club_id, "club1");
    }

    #[test]
    fn test_club_response_from_club() {
        let club = Club::reconstruct(
            ClubId::new("club1").unwrap(),
            "Arena".to_string(),
            "Tokyo".to_string(),
            Money::new(10),
            12,
        );
        let response = ClubResponse::from_club(&club);
        assert_eq!(response.price_per_hour, 10);
        assert_eq!(response.available_seat_count, 12);
    }
}
