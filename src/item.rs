use concordium_std::*;

use crate::errors::ContractResult;
use crate::external::{Item, ItemTransfer};
use crate::state::State;

/// Release the auctioned item by invoking `transfer` on its holding contract.
pub fn release<S: HasStateApi>(
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    item: &Item,
    holder: ContractAddress,
    to: &AccountAddress,
) -> ContractResult<()> {
    let parameter = ItemTransfer {
        id: item.id.clone(),
        from: Address::Contract(holder),
        to: *to,
    };
    host.invoke_contract(
        &item.contract,
        &parameter,
        EntrypointName::new_unchecked("transfer"),
        Amount::zero(),
    )?;
    Ok(())
}
