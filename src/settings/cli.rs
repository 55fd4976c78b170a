use super::Parser;

#[derive(Parser, Debug)]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    /// Print the argon2 PHC string for this password and exit.
    #[arg(long, value_name = "PASSWORD")]
    pub hash_password: Option<String>,
}
