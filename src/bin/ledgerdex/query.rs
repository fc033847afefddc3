use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;

use ledgerdex::core::config::RootConfig;
use ledgerdex::prelude::*;

#[derive(Debug, clap::Args)]
pub struct PageArgs {
    /// max amount of ids per page, capped by the configured limit
    #[arg(long)]
    page_size: Option<u32>,

    /// cursor returned by a previous page
    #[arg(long)]
    cursor: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct CreatedArgs {
    #[arg(long)]
    created_before: Option<SlotIndex>,

    #[arg(long)]
    created_after: Option<SlotIndex>,
}

fn parse_tag(tag: &Option<String>) -> Result<Option<Vec<u8>>, Error> {
    tag.as_deref()
        .map(|x| hex::decode(x.strip_prefix("0x").unwrap_or(x)).map_err(Error::parse))
        .transpose()
}

#[derive(Debug, clap::Args)]
pub struct BasicArgs {
    #[arg(long)]
    has_native_token: Option<bool>,
    #[arg(long)]
    native_token: Option<NativeTokenId>,
    #[arg(long)]
    unlockable_by_address: Option<Address>,
    #[arg(long)]
    address: Option<Address>,
    #[arg(long)]
    has_storage_deposit_return: Option<bool>,
    #[arg(long)]
    storage_deposit_return_address: Option<Address>,
    #[arg(long)]
    has_expiration: Option<bool>,
    #[arg(long)]
    expiration_return_address: Option<Address>,
    #[arg(long)]
    expires_before: Option<SlotIndex>,
    #[arg(long)]
    expires_after: Option<SlotIndex>,
    #[arg(long)]
    has_timelock: Option<bool>,
    #[arg(long)]
    timelocked_before: Option<SlotIndex>,
    #[arg(long)]
    timelocked_after: Option<SlotIndex>,
    #[arg(long)]
    sender: Option<Address>,
    /// hex encoded tag feature
    #[arg(long)]
    tag: Option<String>,
    #[command(flatten)]
    created: CreatedArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Debug, clap::Args)]
pub struct AccountArgs {
    #[arg(long)]
    address: Option<Address>,
    #[arg(long)]
    issuer: Option<Address>,
    #[arg(long)]
    sender: Option<Address>,
    #[command(flatten)]
    created: CreatedArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Debug, clap::Args)]
pub struct AnchorArgs {
    #[arg(long)]
    unlockable_by_address: Option<Address>,
    #[arg(long)]
    state_controller: Option<Address>,
    #[arg(long)]
    governor: Option<Address>,
    #[arg(long)]
    issuer: Option<Address>,
    #[arg(long)]
    sender: Option<Address>,
    #[command(flatten)]
    created: CreatedArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Debug, clap::Args)]
pub struct NftArgs {
    #[arg(long)]
    unlockable_by_address: Option<Address>,
    #[arg(long)]
    address: Option<Address>,
    #[arg(long)]
    has_storage_deposit_return: Option<bool>,
    #[arg(long)]
    storage_deposit_return_address: Option<Address>,
    #[arg(long)]
    has_expiration: Option<bool>,
    #[arg(long)]
    expiration_return_address: Option<Address>,
    #[arg(long)]
    expires_before: Option<SlotIndex>,
    #[arg(long)]
    expires_after: Option<SlotIndex>,
    #[arg(long)]
    has_timelock: Option<bool>,
    #[arg(long)]
    timelocked_before: Option<SlotIndex>,
    #[arg(long)]
    timelocked_after: Option<SlotIndex>,
    #[arg(long)]
    issuer: Option<Address>,
    #[arg(long)]
    sender: Option<Address>,
    /// hex encoded tag feature
    #[arg(long)]
    tag: Option<String>,
    #[command(flatten)]
    created: CreatedArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Debug, clap::Args)]
pub struct FoundryArgs {
    #[arg(long)]
    has_native_token: Option<bool>,
    #[arg(long)]
    native_token: Option<NativeTokenId>,
    /// address of the controlling account
    #[arg(long)]
    account: Option<Address>,
    #[command(flatten)]
    created: CreatedArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Debug, clap::Args)]
pub struct DelegationArgs {
    #[arg(long)]
    address: Option<Address>,
    #[arg(long)]
    validator: Option<Address>,
    #[command(flatten)]
    created: CreatedArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Debug, clap::Args)]
pub struct CombinedArgs {
    #[arg(long)]
    has_native_token: Option<bool>,
    #[arg(long)]
    native_token: Option<NativeTokenId>,
    #[arg(long)]
    unlockable_by_address: Option<Address>,
    #[command(flatten)]
    created: CreatedArgs,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// basic outputs
    Basic(BasicArgs),
    /// account outputs
    Account(AccountArgs),
    /// anchor outputs
    Anchor(AnchorArgs),
    /// nft outputs
    Nft(NftArgs),
    /// foundry outputs
    Foundry(FoundryArgs),
    /// delegation outputs
    Delegation(DelegationArgs),
    /// outputs of every kind at once
    Combined(CombinedArgs),
    /// live account output by account id
    AccountById { id: AccountId },
    /// live anchor output by anchor id
    AnchorById { id: AnchorId },
    /// live nft output by nft id
    NftById { id: NftId },
    /// live foundry output by foundry id
    FoundryById { id: FoundryId },
    /// live delegation output by delegation id
    DelegationById { id: DelegationId },
}

#[derive(Debug, Parser)]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

pub fn run(config: &RootConfig, args: &Args) -> miette::Result<()> {
    let indexer = crate::common::open_indexer(config)?;
    let limits = &config.query;

    let result = match &args.command {
        Command::Basic(x) => indexer.query(&BasicFilter {
            has_native_token: x.has_native_token,
            native_token: x.native_token,
            unlockable_by_address: x.unlockable_by_address.clone(),
            address: x.address.clone(),
            has_storage_deposit_return: x.has_storage_deposit_return,
            storage_deposit_return_address: x.storage_deposit_return_address.clone(),
            has_expiration: x.has_expiration,
            expiration_return_address: x.expiration_return_address.clone(),
            expires_before: x.expires_before,
            expires_after: x.expires_after,
            has_timelock: x.has_timelock,
            timelocked_before: x.timelocked_before,
            timelocked_after: x.timelocked_after,
            sender: x.sender.clone(),
            tag: parse_tag(&x.tag)?,
            created_before: x.created.created_before,
            created_after: x.created.created_after,
            page_size: limits.page_size(x.page.page_size),
            cursor: x.page.cursor.clone(),
        }),
        Command::Account(x) => indexer.query(&AccountFilter {
            address: x.address.clone(),
            issuer: x.issuer.clone(),
            sender: x.sender.clone(),
            created_before: x.created.created_before,
            created_after: x.created.created_after,
            page_size: limits.page_size(x.page.page_size),
            cursor: x.page.cursor.clone(),
        }),
        Command::Anchor(x) => indexer.query(&AnchorFilter {
            unlockable_by_address: x.unlockable_by_address.clone(),
            state_controller: x.state_controller.clone(),
            governor: x.governor.clone(),
            issuer: x.issuer.clone(),
            sender: x.sender.clone(),
            created_before: x.created.created_before,
            created_after: x.created.created_after,
            page_size: limits.page_size(x.page.page_size),
            cursor: x.page.cursor.clone(),
        }),
        Command::Nft(x) => indexer.query(&NftFilter {
            unlockable_by_address: x.unlockable_by_address.clone(),
            address: x.address.clone(),
            has_storage_deposit_return: x.has_storage_deposit_return,
            storage_deposit_return_address: x.storage_deposit_return_address.clone(),
            has_expiration: x.has_expiration,
            expiration_return_address: x.expiration_return_address.clone(),
            expires_before: x.expires_before,
            expires_after: x.expires_after,
            has_timelock: x.has_timelock,
            timelocked_before: x.timelocked_before,
            timelocked_after: x.timelocked_after,
            issuer: x.issuer.clone(),
            sender: x.sender.clone(),
            tag: parse_tag(&x.tag)?,
            created_before: x.created.created_before,
            created_after: x.created.created_after,
            page_size: limits.page_size(x.page.page_size),
            cursor: x.page.cursor.clone(),
        }),
        Command::Foundry(x) => indexer.query(&FoundryFilter {
            has_native_token: x.has_native_token,
            native_token: x.native_token,
            account: x.account.clone(),
            created_before: x.created.created_before,
            created_after: x.created.created_after,
            page_size: limits.page_size(x.page.page_size),
            cursor: x.page.cursor.clone(),
        }),
        Command::Delegation(x) => indexer.query(&DelegationFilter {
            address: x.address.clone(),
            validator: x.validator.clone(),
            created_before: x.created.created_before,
            created_after: x.created.created_after,
            page_size: limits.page_size(x.page.page_size),
            cursor: x.page.cursor.clone(),
        }),
        Command::Combined(x) => indexer.query(&CombinedFilter {
            has_native_token: x.has_native_token,
            native_token: x.native_token,
            unlockable_by_address: x.unlockable_by_address.clone(),
            created_before: x.created.created_before,
            created_after: x.created.created_after,
            page_size: limits.page_size(x.page.page_size),
            cursor: x.page.cursor.clone(),
        }),
        Command::AccountById { id } => indexer.account_by_id(id),
        Command::AnchorById { id } => indexer.anchor_by_id(id),
        Command::NftById { id } => indexer.nft_by_id(id),
        Command::FoundryById { id } => indexer.foundry_by_id(id),
        Command::DelegationById { id } => indexer.delegation_by_id(id),
    }
    .into_diagnostic()?;

    crate::common::print_json(&result)
}
