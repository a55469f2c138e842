use crate::domain::error::DomainError;
use crate::domain::model::{ClubId, Money};

/// クラブエンティティ
/// 時間料金の提供元。`available_seat_count` は一覧表示用のキャッシュで予約判定には使わない
#[derive(Debug, Clone, PartialEq)]
pub struct Club {
    id: ClubId,
    name: String,
    address: String,
    price_per_hour: Money,
    available_seat_count: u32,
}

impl Club {
    /// 新しいクラブを作成
    /// バリデーション:
    /// - 名前と住所は空でない
    /// - 時間料金は正の値
    pub fn new(
        id: ClubId,
        name: String,
        address: String,
        price_per_hour: Money,
    ) -> Result<Self, DomainError> {
        let price_per_hour = validate_details(&name, &address, price_per_hour)?;

        Ok(Self {
            id,
            name,
            address,
            price_per_hour,
            available_seat_count: 0,
        })
    }

    /// データベースから取得したデータでクラブを再構築
    pub fn reconstruct(
        id: ClubId,
        name: String,
        address: String,
        price_per_hour: Money,
        available_seat_count: u32,
    ) -> Self {
        Self {
            id,
            name,
            address,
            price_per_hour,
            available_seat_count,
        }
    }

    pub fn id(&self) -> &ClubId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// 時間料金を取得
    pub fn price_per_hour(&self) -> Money {
        self.price_per_hour
    }

    pub fn available_seat_count(&self) -> u32 {
        self.available_seat_count
    }

    /// 表示用の座席数を更新
    pub fn set_available_seat_count(&mut self, count: u32) {
        self.available_seat_count = count;
    }

    /// 名前・住所・時間料金を変更する
    /// 検証は作成時と同じ。既存の予約の金額には影響しない
    pub fn update_details(
        &mut self,
        name: String,
        address: String,
        price_per_hour: Money,
    ) -> Result<(), DomainError> {
        self.price_per_hour = validate_details(&name, &address, price_per_hour)?;
        self.name = name;
        self.address = address;
        Ok(())
    }
}

fn validate_details(name: &str, address: &str, price_per_hour: Money) -> Result<Money, DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidValue(
            "クラブ名は空にできません".to_string(),
        ));
    }
    if address.trim().is_empty() {
        return Err(DomainError::InvalidValue(
            "住所は空にできません".to_string(),
        ));
    }
    Money::positive(price_per_hour.amount())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_club_creation() {
        let club = Club::new(
            ClubId::new("club1").unwrap(),
            "Cyber Arena".to_string(),
            "1 Main St".to_string(),
            Money::new(10),
        )
        .unwrap();
        assert_eq!(club.price_per_hour().amount(), 10);
        assert_eq!(club.available_seat_count(), 0);
    }

    #[test]
    fn test_club_requires_positive_rate() {
        let result = Club::new(
            ClubId::new("club1").unwrap(),
            "Cyber Arena".to_string(),
            "1 Main St".to_string(),
            Money::new(0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_club_requires_name_and_address() {
        let id = ClubId::new("club1").unwrap();
        assert!(Club::new(id.clone(), " ".to_string(), "addr".to_string(), Money::new(5)).is_err());
        assert!(Club::new(id, "name".to_string(), "".to_string(), Money::new(5)).is_err());
    }

    #[test]
    fn test_update_details_keeps_seat_count() {
        let mut club = Club::reconstruct(
            ClubId::new("club1").unwrap(),
            "Cyber Arena".to_string(),
            "1 Main St".to_string(),
            Money::new(10),
            4,
        );
        club.update_details("Arena 2".to_string(), "2 Main St".to_string(), Money::new(15))
            .unwrap();
        assert_eq!(club.name(), "Arena 2");
        assert_eq!(club.price_per_hour().amount(), 15);
        assert_eq!(club.available_seat_count(), 4);
    }

    #[test]
    fn test_invalid_update_changes_nothing() {
        let mut club = Club::reconstruct(
            ClubId::new("club1").unwrap(),
            "Cyber Arena".to_string(),
            "1 Main St".to_string(),
            Money::new(10),
            0,
        );
        assert!(club
            .update_details("Arena".to_string(), "addr".to_string(), Money::new(-1))
            .is_err());
        assert_eq!(club.name(), "Cyber Arena");
        assert_eq!(club.price_per_hour().amount(), 10);
    }
}
