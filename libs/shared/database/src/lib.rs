pub mod supabase;

pub use supabase::{DbError, SupabaseClient};
