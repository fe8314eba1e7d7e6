// ============================================================================
// Heures de marché (New York)
// ============================================================================
// Le NYSE est ouvert du lundi au vendredi, de 9h30 à 16h00 heure de New York.
// Les jours fériés ne sont pas gérés.
// ============================================================================

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;

const OPEN_MINUTES: u32 = 9 * 60 + 30;
const CLOSE_MINUTES: u32 = 16 * 60;

/// Vérifie si le marché est ouvert à l'instant donné
pub fn is_market_hours<Tz: TimeZone>(now: &DateTime<Tz>) -> bool {
    let local = now.with_timezone(&New_York);

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }

    let minutes = local.hour() * 60 + local.minute();
    (OPEN_MINUTES..CLOSE_MINUTES).contains(&minutes)
}

/// Date du jour à New York
pub fn exchange_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&New_York).date_naive()
}
