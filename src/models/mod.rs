pub mod roberta;
