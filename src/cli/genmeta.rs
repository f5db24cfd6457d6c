use crate::{autobackup::genmeta, error::Result};

use super::{args::GenmetaArgs, check_dir};

pub async fn main(args: GenmetaArgs) -> Result<()> {
    check_dir(&args.dir)?;
    genmeta(&args.dir).await?;
    Ok(())
}
