use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// クラブ登録用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CreateClubRequest {
    pub name: String,
    pub address: String,
    pub price_per_hour: i64, // 通貨の最小単位
}

/// クラブ更新用のリクエストDTO
/// 空き座席数は座席の追加・削除で決まるため受け付けない
#[derive(Serialize, Deserialize)]
pub struct UpdateClubRequest {
    pub name: String,
    pub address: String,
    pub price_per_hour: i64,
}

/// 座席追加用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AddSeatsRequest {
    pub count: u32,
    #[serde(default)]
    pub description: Option<String>,
}

/// 座席更新用のリクエストDTO
/// 変更できるのは説明のみ
#[derive(Serialize, Deserialize)]
pub struct UpdateSeatRequest {
    pub description: String,
}

/// 予約作成用のリクエストDTO
/// 予約者は `X-User-ID` ヘッダーから取得する
#[derive(Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub club_id: String,
    pub seat_number: u32,
    /// RFC 3339形式
    pub start_time: DateTime<Utc>,
    pub hours: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_reservation_request_deserialization() {
        let json = r#"{
            "club_id": "club1",
            "seat_number": 3,
            "start_time": "2025-03-01T14:00:00Z",
            "hours": 2
        }"#;

        let request: CreateReservationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.club_id, "club1");
        assert_eq!(request.seat_number, 3);
        assert_eq!(request.hours, 2);
        assert_eq!(request.start_time.to_rfc3339(), "2025-03-01T14:00:00+00:00");
    }

    #[test]
    fn test_create_reservation_request_rejects_bad_timestamp() {
        let json = r#"{"club_id":"club1","seat_number":3,"start_time":"tomorrow","hours":2}"#;
        assert!(serde_json::from_str::<CreateReservationRequest>(json).is_err());
    }

    #[test]
    fn test_add_seats_request_without_description() {
        let request: AddSeatsRequest = serde_json::from_str(r#"{"count": 4}"#).unwrap();
        assert_eq!(request.count, 4);
        assert!(request.description.is_none());
    }

    #[test]
    fn test_add_seats_request_negative_count_is_rejected() {
        assert!(serde_json::from_str::<AddSeatsRequest>(r#"{"count": -1}"#).is_err());
    }

    #[test]
    fn test_update_seat_request_ignores_availability() {
        let request: UpdateSeatRequest =
            serde_json::from_str(r#"{"description": "RTX 4090", "available": false}"#).unwrap();
        assert_eq!(request.description, "RTX 4090");
    }
}
