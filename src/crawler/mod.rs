/// FinMind 開放資料
pub mod finmind;
