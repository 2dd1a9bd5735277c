mod reminder_hub;

pub use reminder_hub::ReminderHub;
