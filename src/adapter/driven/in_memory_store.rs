use crate::domain::model::{
    Club, ClubId, Money, Reservation, ReservationId, ReservationStatus, Seat, SeatId, SeatNumber,
    TimeWindow, UserId,
};
use crate::domain::port::{
    ClubRepository, ClubTransaction, ClubTransactionManager, PricingLookup, RepositoryError,
    ReservationRepository, SeatRepository, SeatTransaction, SeatTransactionManager,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Debug, Default)]
struct StoreState {
    clubs: HashMap<ClubId, Club>,
    seats: HashMap<SeatId, Seat>,
    reservations: HashMap<ReservationId, Reservation>,
}

/// プロセス内メモリのストア
///
/// すべてのポートを実装する。座席トランザクションは座席ごとの非同期Mutexで直列化し、
/// クラブトランザクションはクラブのMutexと所属する全座席のMutexを取得する。
/// 書き込みはコミット時にまとめて反映する。クローンは同じデータを共有する
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    seat_locks: Arc<Mutex<HashMap<SeatId, Arc<Mutex<()>>>>>,
    club_locks: Arc<Mutex<HashMap<ClubId, Arc<Mutex<()>>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn seat_lock(&self, seat_id: SeatId) -> Arc<Mutex<()>> {
        let mut locks = self.seat_locks.lock().await;
        locks.entry(seat_id).or_default().clone()
    }

    async fn club_lock(&self, club_id: &ClubId) -> Arc<Mutex<()>> {
        let mut locks = self.club_locks.lock().await;
        locks.entry(club_id.clone()).or_default().clone()
    }
}

fn with_status(
    reservation: &Reservation,
    status: ReservationStatus,
) -> Result<Reservation, RepositoryError> {
    Reservation::reconstruct(
        reservation.id(),
        reservation.club_id().clone(),
        reservation.seat_number(),
        reservation.user_id().clone(),
        reservation.start_time(),
        reservation.end_time(),
        reservation.total_price(),
        status,
        reservation.created_at(),
    )
    .map_err(|e| RepositoryError::ConstraintViolation(e.to_string()))
}

fn with_availability(seat: &Seat, available: bool) -> Seat {
    Seat::reconstruct(
        seat.id(),
        seat.club_id().clone(),
        seat.seat_number(),
        seat.description().to_string(),
        available,
    )
}

#[async_trait]
impl PricingLookup for InMemoryStore {
    async fn club_rate(&self, club_id: &ClubId) -> Result<Option<Money>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.clubs.get(club_id).map(Club::price_per_hour))
    }
}

#[async_trait]
impl ClubRepository for InMemoryStore {
    async fn insert(&self, club: &Club) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.clubs.contains_key(club.id()) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "クラブIDが重複しています: {}",
                club.id()
            )));
        }
        state.clubs.insert(club.id().clone(), club.clone());
        Ok(())
    }

    async fn find_by_id(&self, club_id: &ClubId) -> Result<Option<Club>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.clubs.get(club_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Club>, RepositoryError> {
        let state = self.state.read().await;
        let mut clubs: Vec<Club> = state.clubs.values().cloned().collect();
        clubs.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });
        Ok(clubs)
    }
}

#[async_trait]
impl SeatRepository for InMemoryStore {
    async fn find_by_id(&self, seat_id: SeatId) -> Result<Option<Seat>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.seats.get(&seat_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Seat>, RepositoryError> {
        let state = self.state.read().await;
        let mut seats: Vec<Seat> = state.seats.values().cloned().collect();
        seats.sort_by(|a, b| {
            a.club_id()
                .as_str()
                .cmp(b.club_id().as_str())
                .then_with(|| a.seat_number().cmp(&b.seat_number()))
        });
        Ok(seats)
    }

    async fn update_description(
        &self,
        seat_id: SeatId,
        description: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.seats.get(&seat_id) {
            let updated = Seat::reconstruct(
                existing.id(),
                existing.club_id().clone(),
                existing.seat_number(),
                description.to_string(),
                existing.is_available(),
            );
            state.seats.insert(seat_id, updated);
        }
        Ok(())
    }

    async fn find_by_club_and_number(
        &self,
        club_id: &ClubId,
        seat_number: SeatNumber,
    ) -> Result<Option<Seat>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .seats
            .values()
            .find(|seat| seat.club_id() == club_id && seat.seat_number() == seat_number)
            .cloned())
    }

    async fn find_by_club(&self, club_id: &ClubId) -> Result<Vec<Seat>, RepositoryError> {
        let state = self.state.read().await;
        let mut seats: Vec<Seat> = state
            .seats
            .values()
            .filter(|seat| seat.club_id() == club_id)
            .cloned()
            .collect();
        seats.sort_by_key(Seat::seat_number);
        Ok(seats)
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn find_by_id(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.reservations.get(&reservation_id).cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Reservation>, RepositoryError> {
        let state = self.state.read().await;
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect();
        reservations.sort_by_key(Reservation::start_time);
        Ok(reservations)
    }
}

#[async_trait]
impl SeatTransactionManager for InMemoryStore {
    async fn begin(&self, seat_id: SeatId) -> Result<Box<dyn SeatTransaction>, RepositoryError> {
        let guard = self.seat_lock(seat_id).await.lock_owned().await;

        if !self.state.read().await.seats.contains_key(&seat_id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "ロック対象の座席が存在しません: {}",
                seat_id
            )));
        }

        Ok(Box::new(InMemorySeatTransaction {
            store: self.clone(),
            _seat_guard: guard,
            writes: Vec::new(),
        }))
    }
}

#[derive(Debug)]
enum StagedWrite {
    InsertReservation(Reservation),
    SetStatus(ReservationId, ReservationStatus),
    SetAvailability(SeatId, bool),
}

/// 座席ロックを保持したメモリ内トランザクション
/// 読み取りはコミット済みの状態を見る。書き込みはコミットまで保留される
pub struct InMemorySeatTransaction {
    store: InMemoryStore,
    _seat_guard: OwnedMutexGuard<()>,
    writes: Vec<StagedWrite>,
}

#[async_trait]
impl SeatTransaction for InMemorySeatTransaction {
    async fn find_active_overlap(
        &mut self,
        club_id: &ClubId,
        seat_number: SeatNumber,
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let state = self.store.state.read().await;
        Ok(state
            .reservations
            .values()
            .filter(|r| r.conflicts_with(club_id, seat_number, window, now))
            .cloned()
            .collect())
    }

    async fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let state = self.store.state.read().await;
        Ok(state.reservations.get(&reservation_id).cloned())
    }

    async fn insert_reservation(
        &mut self,
        reservation: &Reservation,
    ) -> Result<(), RepositoryError> {
        self.writes
            .push(StagedWrite::InsertReservation(reservation.clone()));
        Ok(())
    }

    async fn set_reservation_status(
        &mut self,
        reservation_id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), RepositoryError> {
        self.writes.push(StagedWrite::SetStatus(reservation_id, status));
        Ok(())
    }

    async fn set_seat_availability(
        &mut self,
        seat_id: SeatId,
        available: bool,
    ) -> Result<(), RepositoryError> {
        self.writes
            .push(StagedWrite::SetAvailability(seat_id, available));
        Ok(())
    }

    /// 全書き込みを検証してから一括で反映する。1件でも不正なら何も反映しない
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let mut state = self.store.state.write().await;

        let mut reservations = Vec::new();
        let mut seats = Vec::new();
        for write in &self.writes {
            match write {
                StagedWrite::InsertReservation(reservation) => {
                    if state.reservations.contains_key(&reservation.id()) {
                        return Err(RepositoryError::ConstraintViolation(format!(
                            "予約IDが重複しています: {}",
                            reservation.id()
                        )));
                    }
                    reservations.push(reservation.clone());
                }
                StagedWrite::SetStatus(reservation_id, status) => {
                    let current = state.reservations.get(reservation_id).ok_or_else(|| {
                        RepositoryError::ConstraintViolation(format!(
                            "更新対象の予約が存在しません: {}",
                            reservation_id
                        ))
                    })?;
                    reservations.push(with_status(current, *status)?);
                }
                StagedWrite::SetAvailability(seat_id, available) => {
                    let current = state.seats.get(seat_id).ok_or_else(|| {
                        RepositoryError::ConstraintViolation(format!(
                            "更新対象の座席が存在しません: {}",
                            seat_id
                        ))
                    })?;
                    seats.push(with_availability(current, *available));
                }
            }
        }

        for reservation in reservations {
            state.reservations.insert(reservation.id(), reservation);
        }
        for seat in seats {
            state.seats.insert(seat.id(), seat);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        tracing::debug!(discarded = self.writes.len(), "in-memory transaction rolled back");
        Ok(())
    }
}

#[async_trait]
impl ClubTransactionManager for InMemoryStore {
    async fn begin_club(
        &self,
        club_id: &ClubId,
    ) -> Result<Option<Box<dyn ClubTransaction>>, RepositoryError> {
        let club_guard = self.club_lock(club_id).await.lock_owned().await;

        // 座席の追加はクラブロック下でしか起きないので、ここで得た一覧がロック対象のすべて
        let seat_ids: Vec<SeatId> = {
            let state = self.state.read().await;
            if !state.clubs.contains_key(club_id) {
                return Ok(None);
            }
            let mut seats: Vec<&Seat> = state
                .seats
                .values()
                .filter(|seat| seat.club_id() == club_id)
                .collect();
            seats.sort_by_key(|seat| seat.seat_number());
            seats.iter().map(|seat| seat.id()).collect()
        };

        let mut seat_guards = Vec::with_capacity(seat_ids.len());
        for seat_id in seat_ids {
            seat_guards.push(self.seat_lock(seat_id).await.lock_owned().await);
        }

        Ok(Some(Box::new(InMemoryClubTransaction {
            store: self.clone(),
            club_id: club_id.clone(),
            _club_guard: club_guard,
            _seat_guards: seat_guards,
            writes: Vec::new(),
        })))
    }
}

#[derive(Debug)]
enum StagedClubWrite {
    InsertSeats(Vec<Seat>),
    DeleteSeat(SeatId),
    SaveClub(Club),
    DeleteClub,
}

/// クラブと全座席のロックを保持したメモリ内トランザクション
pub struct InMemoryClubTransaction {
    store: InMemoryStore,
    club_id: ClubId,
    _club_guard: OwnedMutexGuard<()>,
    _seat_guards: Vec<OwnedMutexGuard<()>>,
    writes: Vec<StagedClubWrite>,
}

#[async_trait]
impl ClubTransaction for InMemoryClubTransaction {
    async fn club(&mut self) -> Result<Club, RepositoryError> {
        let state = self.store.state.read().await;
        state.clubs.get(&self.club_id).cloned().ok_or_else(|| {
            RepositoryError::ConstraintViolation(format!(
                "ロック中のクラブが存在しません: {}",
                self.club_id
            ))
        })
    }

    async fn seats(&mut self) -> Result<Vec<Seat>, RepositoryError> {
        self.store.find_by_club(&self.club_id).await
    }

    async fn count_active_reservations(
        &mut self,
        seat_number: Option<SeatNumber>,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let state = self.store.state.read().await;
        let count = state
            .reservations
            .values()
            .filter(|r| r.club_id() == &self.club_id)
            .filter(|r| seat_number.map_or(true, |number| r.seat_number() == number))
            .filter(|r| r.status() == ReservationStatus::Active && r.end_time() > now)
            .count();
        Ok(count as u64)
    }

    async fn insert_seats(&mut self, seats: &[Seat]) -> Result<(), RepositoryError> {
        self.writes.push(StagedClubWrite::InsertSeats(seats.to_vec()));
        Ok(())
    }

    async fn delete_seat(&mut self, seat_id: SeatId) -> Result<(), RepositoryError> {
        self.writes.push(StagedClubWrite::DeleteSeat(seat_id));
        Ok(())
    }

    async fn save_club(&mut self, club: &Club) -> Result<(), RepositoryError> {
        self.writes.push(StagedClubWrite::SaveClub(club.clone()));
        Ok(())
    }

    async fn delete_club(&mut self) -> Result<(), RepositoryError> {
        self.writes.push(StagedClubWrite::DeleteClub);
        Ok(())
    }

    /// クラブと座席の写しに書き込みを順に適用し、すべて成功した場合のみ差し替える
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let mut state = self.store.state.write().await;

        let mut club = state.clubs.get(&self.club_id).cloned();
        let mut seats: HashMap<SeatId, Seat> = state
            .seats
            .values()
            .filter(|seat| seat.club_id() == &self.club_id)
            .map(|seat| (seat.id(), seat.clone()))
            .collect();

        for write in &self.writes {
            match write {
                StagedClubWrite::InsertSeats(new_seats) => {
                    for seat in new_seats {
                        let clashes = seat.club_id() != &self.club_id
                            || state.seats.contains_key(&seat.id())
                            || seats
                                .values()
                                .any(|existing| existing.seat_number() == seat.seat_number());
                        if clashes {
                            return Err(RepositoryError::ConstraintViolation(format!(
                                "座席番号が重複しています: {} / {}",
                                seat.club_id(),
                                seat.seat_number()
                            )));
                        }
                        seats.insert(seat.id(), seat.clone());
                    }
                }
                StagedClubWrite::DeleteSeat(seat_id) => {
                    if seats.remove(seat_id).is_none() {
                        return Err(RepositoryError::ConstraintViolation(format!(
                            "削除対象の座席が存在しません: {}",
                            seat_id
                        )));
                    }
                }
                StagedClubWrite::SaveClub(updated) => {
                    if club.is_none() {
                        return Err(RepositoryError::ConstraintViolation(format!(
                            "更新対象のクラブが存在しません: {}",
                            self.club_id
                        )));
                    }
                    club = Some(updated.clone());
                }
                StagedClubWrite::DeleteClub => {
                    club = None;
                    seats.clear();
                }
            }
        }

        state.seats.retain(|_, seat| seat.club_id() != &self.club_id);
        state.seats.extend(seats);
        match club {
            Some(club) => {
                state.clubs.insert(self.club_id.clone(), club);
            }
            None => {
                state.clubs.remove(&self.club_id);
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        tracing::debug!(discarded = self.writes.len(), "in-memory club transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BookingHours;
    use chrono::{Duration, TimeZone};
    use std::time::Duration as StdDuration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn club_id() -> ClubId {
        ClubId::new("club1").unwrap()
    }

    fn seat(number: u32) -> Seat {
        Seat::new(
            SeatId::new(),
            club_id(),
            SeatNumber::new(number).unwrap(),
            "RTX".to_string(),
        )
    }

    async fn add(store: &InMemoryStore, seats: &[Seat]) -> Result<(), RepositoryError> {
        let mut tx = store.begin_club(&club_id()).await?.unwrap();
        tx.insert_seats(seats).await?;
        tx.commit().await
    }

    async fn seeded() -> (InMemoryStore, Seat) {
        let store = InMemoryStore::new();
        let club = Club::new(club_id(), "Arena".to_string(), "Tokyo".to_string(), Money::new(10))
            .unwrap();
        ClubRepository::insert(&store, &club).await.unwrap();
        let seat = seat(1);
        add(&store, &[seat.clone()]).await.unwrap();
        (store, seat)
    }

    fn booking(seat: &Seat) -> Reservation {
        Reservation::book(
            ReservationId::new(),
            seat.club_id().clone(),
            seat.seat_number(),
            UserId::new("u1").unwrap(),
            now() + Duration::hours(2),
            BookingHours::new(2).unwrap(),
            Money::new(10),
            now(),
        )
        .unwrap()
    }

    async fn book(store: &InMemoryStore, seat: &Seat) -> Reservation {
        let reservation = booking(seat);
        let mut tx = store.begin(seat.id()).await.unwrap();
        tx.insert_reservation(&reservation).await.unwrap();
        tx.commit().await.unwrap();
        reservation
    }

    #[tokio::test]
    async fn test_commit_applies_all_writes() {
        let (store, seat) = seeded().await;
        let reservation = booking(&seat);

        let mut tx = store.begin(seat.id()).await.unwrap();
        tx.insert_reservation(&reservation).await.unwrap();
        tx.set_seat_availability(seat.id(), false).await.unwrap();
        tx.commit().await.unwrap();

        assert!(ReservationRepository::find_by_id(&store, reservation.id())
            .await
            .unwrap()
            .is_some());
        let stored = store
            .find_by_club_and_number(seat.club_id(), seat.seat_number())
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_available());
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_no_trace() {
        let (store, seat) = seeded().await;
        let reservation = booking(&seat);

        {
            let mut tx = store.begin(seat.id()).await.unwrap();
            tx.insert_reservation(&reservation).await.unwrap();
            tx.set_seat_availability(seat.id(), false).await.unwrap();
        }

        assert!(ReservationRepository::find_by_id(&store, reservation.id())
            .await
            .unwrap()
            .is_none());
        // ロックも解放されている
        let tx = store.begin(seat.id()).await.unwrap();
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_write_rejects_whole_commit() {
        let (store, seat) = seeded().await;
        let reservation = booking(&seat);

        let mut tx = store.begin(seat.id()).await.unwrap();
        tx.insert_reservation(&reservation).await.unwrap();
        tx.set_seat_availability(SeatId::new(), false).await.unwrap();
        assert!(matches!(
            tx.commit().await,
            Err(RepositoryError::ConstraintViolation(_))
        ));

        assert!(ReservationRepository::find_by_id(&store, reservation.id())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_same_seat_transactions_are_serialized() {
        let (store, seat) = seeded().await;
        let first = store.begin(seat.id()).await.unwrap();

        let second = tokio::time::timeout(StdDuration::from_millis(50), store.begin(seat.id())).await;
        assert!(second.is_err(), "second transaction must wait for the lock");

        drop(first);
        let second = tokio::time::timeout(StdDuration::from_millis(50), store.begin(seat.id())).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_different_seats_do_not_block() {
        let (store, seat) = seeded().await;
        let other = self::seat(2);
        add(&store, &[other.clone()]).await.unwrap();

        let _held = store.begin(seat.id()).await.unwrap();
        let result = tokio::time::timeout(StdDuration::from_millis(50), store.begin(other.id())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_seat_number_rejects_whole_batch() {
        let (store, _) = seeded().await;
        let fresh = seat(2);
        let clash = seat(1);

        let result = add(&store, &[fresh.clone(), clash]).await;
        assert!(matches!(result, Err(RepositoryError::ConstraintViolation(_))));
        assert!(SeatRepository::find_by_id(&store, fresh.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_club_transaction_waits_for_seat_transaction() {
        let (store, seat) = seeded().await;
        let seat_tx = store.begin(seat.id()).await.unwrap();

        let blocked =
            tokio::time::timeout(StdDuration::from_millis(50), store.begin_club(&club_id())).await;
        assert!(blocked.is_err(), "club transaction must wait for the seat lock");

        drop(seat_tx);
        let club_tx = store.begin_club(&club_id()).await.unwrap().unwrap();

        // クラブトランザクション中は座席トランザクションも待たされる
        let blocked = tokio::time::timeout(StdDuration::from_millis(50), store.begin(seat.id())).await;
        assert!(blocked.is_err());
        club_tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_begin_club_for_unknown_club() {
        let store = InMemoryStore::new();
        let tx = store.begin_club(&club_id()).await.unwrap();
        assert!(tx.is_none());
    }

    #[tokio::test]
    async fn test_count_active_reservations() {
        let (store, seat) = seeded().await;
        let reservation = book(&store, &seat).await;

        let mut tx = store.begin_club(&club_id()).await.unwrap().unwrap();
        assert_eq!(tx.count_active_reservations(None, now()).await.unwrap(), 1);
        assert_eq!(
            tx.count_active_reservations(Some(SeatNumber::new(2).unwrap()), now())
                .await
                .unwrap(),
            0
        );
        // 終了後は数えない
        assert_eq!(
            tx.count_active_reservations(Some(seat.seat_number()), reservation.end_time())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_club_removes_seats_and_keeps_history() {
        let (store, seat) = seeded().await;
        let reservation = book(&store, &seat).await;

        let mut tx = store.begin_club(&club_id()).await.unwrap().unwrap();
        tx.delete_club().await.unwrap();
        tx.commit().await.unwrap();

        assert!(ClubRepository::find_by_id(&store, &club_id()).await.unwrap().is_none());
        assert!(SeatRepository::find_by_id(&store, seat.id()).await.unwrap().is_none());
        assert!(ReservationRepository::find_by_id(&store, reservation.id())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_description_preserves_availability() {
        let (store, seat) = seeded().await;
        let mut tx = store.begin(seat.id()).await.unwrap();
        tx.set_seat_availability(seat.id(), false).await.unwrap();
        tx.commit().await.unwrap();

        store.update_description(seat.id(), "RTX 4090").await.unwrap();

        let stored = SeatRepository::find_by_id(&store, seat.id()).await.unwrap().unwrap();
        assert_eq!(stored.description(), "RTX 4090");
        assert!(!stored.is_available());
    }
}
