// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod club;
mod seat;
mod reservation;

pub use value_objects::{
    ClubId, UserId, SeatId, ReservationId,
    SeatNumber, BookingHours, MAX_BOOKING_HOURS,
    Money,
    TimeWindow,
    ReservationStatus,
};

pub use club::Club;
pub use seat::Seat;
pub use reservation::{cancellation_grace_period, Reservation, CANCELLATION_GRACE_HOURS};
