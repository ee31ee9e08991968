use anyhow::Result;

pub fn run() -> Result<()> {
    println!("yuptime-operator {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
