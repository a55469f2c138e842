use crate::domain::error::DomainError;
use crate::domain::model::{ClubId, SeatId, SeatNumber};

/// 座席（PC）エンティティ
/// `available` は予約状況から導かれるキャッシュ値で、予約エンジンのみが書き換える
#[derive(Debug, Clone, PartialEq)]
pub struct Seat {
    id: SeatId,
    club_id: ClubId,
    seat_number: SeatNumber,
    description: String,
    available: bool,
}

impl Seat {
    /// 新しい座席を作成
    /// 作成直後は利用可能
    ///
    /// # Arguments
    /// * `id` - 座席ID
    /// * `club_id` - 所属クラブID
    /// * `seat_number` - クラブ内の座席番号
    /// * `description` - 説明（スペック等）
    pub fn new(id: SeatId, club_id: ClubId, seat_number: SeatNumber, description: String) -> Self {
        Self {
            id,
            club_id,
            seat_number,
            description,
            available: true,
        }
    }

    /// データベースから取得したデータで座席を再構築
    pub fn reconstruct(
        id: SeatId,
        club_id: ClubId,
        seat_number: SeatNumber,
        description: String,
        available: bool,
    ) -> Self {
        Self {
            id,
            club_id,
            seat_number,
            description,
            available,
        }
    }

    /// 座席IDを取得
    pub fn id(&self) -> SeatId {
        self.id
    }

    /// 所属クラブIDを取得
    pub fn club_id(&self) -> &ClubId {
        &self.club_id
    }

    /// 座席番号を取得
    pub fn seat_number(&self) -> SeatNumber {
        self.seat_number
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// 利用可能フラグを取得（表示用の参考値）
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// 予約受付前の高速チェック
    /// 重複判定の代わりにはならない
    ///
    /// # Returns
    /// * `Ok(())` - 利用可能
    /// * `Err(DomainError::SeatUnavailable)` - 利用不可としてマーク済み
    pub fn ensure_available(&self) -> Result<(), DomainError> {
        if !self.available {
            return Err(DomainError::SeatUnavailable);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(available: bool) -> Seat {
        Seat::reconstruct(
            SeatId::new(),
            ClubId::new("club1").unwrap(),
            SeatNumber::new(3).unwrap(),
            "RTX 4070".to_string(),
            available,
        )
    }

    #[test]
    fn test_new_seat_is_available() {
        let seat = Seat::new(
            SeatId::new(),
            ClubId::new("club1").unwrap(),
            SeatNumber::new(1).unwrap(),
            String::new(),
        );
        assert!(seat.is_available());
        assert_eq!(seat.seat_number().value(), 1);
    }

    #[test]
    fn test_ensure_available() {
        assert!(seat(true).ensure_available().is_ok());
        assert_eq!(
            seat(false).ensure_available(),
            Err(DomainError::SeatUnavailable)
        );
    }
}
