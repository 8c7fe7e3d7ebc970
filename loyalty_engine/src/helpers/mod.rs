pub mod luhn;
