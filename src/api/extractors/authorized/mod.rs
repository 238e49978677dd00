/**
 * Responsibility
 *  - core と types を束ねる
 *  - handler に公開する型 (Authorized<P> と権限タグ) を制御する
 */
mod core;
mod types;

pub use self::core::{Authorized, Permission};
pub use types::*;
